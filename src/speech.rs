//! Text-to-speech output sinks.

use std::process::Stdio;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Speaks an utterance. Returns once playback has finished.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Writes utterances to the log instead of an audio device.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSpeech;

#[async_trait]
impl SpeechSink for LogSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        info!(target: "speech", chars = text.len(), "speaking: {text}");
        Ok(())
    }
}

/// Pipes the utterance into an external TTS program on stdin
/// (e.g. `espeak-ng --stdin`) and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a shell-like command line on whitespace. `None` for blank input.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SpeechSink for CommandSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .with_context(|| format!("spawn tts program `{}`", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .context("write utterance to tts stdin")?;
        }

        let status = child.wait().await.context("wait for tts program")?;
        if !status.success() {
            bail!("tts program `{}` exited with {status}", self.program);
        }
        debug!(target: "speech", program = %self.program, "utterance played");
        Ok(())
    }
}

/// Keeps every utterance in memory.
#[derive(Debug, Default)]
pub struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("speech mutex poisoned").clone()
    }
}

#[async_trait]
impl SpeechSink for RecordingSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken
            .lock()
            .expect("speech mutex poisoned")
            .push(text.to_string());
        Ok(())
    }
}
