// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sources::Location;

pub const ENV_CONFIG_PATH: &str = "BRIEF_CONFIG_PATH";
pub const DEFAULT_TOML_PATH: &str = "config/assistant.toml";
pub const DEFAULT_JSON_PATH: &str = "config/assistant.json";

const ENV_OPEN_WEATHER_API_KEY: &str = "OPEN_WEATHER_API_KEY";
const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
const ENV_LATITUDE: &str = "BRIEF_LATITUDE";
const ENV_LONGITUDE: &str = "BRIEF_LONGITUDE";
const ENV_COUNTRY: &str = "BRIEF_COUNTRY";
const ENV_TTS_COMMAND: &str = "BRIEF_TTS_COMMAND";

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Empty means the weather source is not configured.
    pub open_weather_api_key: String,
    /// Empty means the news source is not configured.
    pub news_api_key: String,
    pub location: Location,
    /// e.g. "espeak-ng --stdin". Unset means utterances are only logged.
    pub tts_command: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            open_weather_api_key: String::new(),
            news_api_key: String::new(),
            location: Location::default(),
            tts_command: None,
            http_timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&content, ext.as_str())?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolve config file, then apply environment overrides:
    /// 1) $BRIEF_CONFIG_PATH
    /// 2) config/assistant.toml
    /// 3) config/assistant.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_TOML_PATH).exists() {
            Self::load_from_file(Path::new(DEFAULT_TOML_PATH))?
        } else if Path::new(DEFAULT_JSON_PATH).exists() {
            Self::load_from_file(Path::new(DEFAULT_JSON_PATH))?
        } else {
            Self::default()
        };
        cfg.apply_env();
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var(ENV_OPEN_WEATHER_API_KEY) {
            self.open_weather_api_key = v;
        }
        if let Ok(v) = std::env::var(ENV_NEWS_API_KEY) {
            self.news_api_key = v;
        }
        if let Some(v) = env_f64(ENV_LATITUDE) {
            self.location.latitude = v;
        }
        if let Some(v) = env_f64(ENV_LONGITUDE) {
            self.location.longitude = v;
        }
        if let Ok(v) = std::env::var(ENV_COUNTRY) {
            self.location.country = v;
        }
        if let Ok(v) = std::env::var(ENV_TTS_COMMAND) {
            self.tts_command = Some(v);
        }
    }

    fn sanitize(&mut self) {
        self.open_weather_api_key = self.open_weather_api_key.trim().to_string();
        self.news_api_key = self.news_api_key.trim().to_string();
        self.location.country = self.location.country.trim().to_ascii_lowercase();
        if self.location.country.is_empty() {
            self.location.country = Location::default().country;
        }
        if !(-90.0..=90.0).contains(&self.location.latitude) {
            self.location.latitude = Location::default().latitude;
        }
        if !(-180.0..=180.0).contains(&self.location.longitude) {
            self.location.longitude = Location::default().longitude;
        }
        if self
            .tts_command
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            self.tts_command = None;
        }
        if self.http_timeout_secs == 0 {
            self.http_timeout_secs = default_timeout_secs();
        }
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "toml" {
        return toml::from_str(s).context("parsing TOML config");
    }
    if hint_ext == "json" {
        return serde_json::from_str(s).context("parsing JSON config");
    }
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported config format: {e}"))
}
