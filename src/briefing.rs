//! # Briefing
//! The spoken message an alarm delivers: statistics, then optionally weather and news.
//!
//! Every section has a fallback sentence, so an upstream outage changes the wording
//! of the briefing but never aborts it.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::error::FetchError;
use crate::scheduler::{Alarm, AlarmAction, AlarmMeta};
use crate::sources::{CaseSummary, Headline, Sources, WeatherReport};
use crate::speech::SpeechSink;

pub const STATS_FALLBACK: &str = "Unfortunately an error occurred when getting latest covid data.";
pub const WEATHER_FALLBACK: &str = "Weather information is not available right now.";
pub const NO_NEWS: &str = "There are no top news for you right now.";
pub const CLOSING: &str = "This is the end of your briefing. Have a nice day.";

pub fn greeting(title: &str) -> String {
    format!("Hello! This is a scheduled daily brief titled: {title}.")
}

pub fn stats_brief(stats: &Result<CaseSummary, FetchError>) -> String {
    let Ok(s) = stats else {
        return STATS_FALLBACK.to_string();
    };
    let freshness = if s.is_latest {
        "Today,"
    } else {
        "Latest data is not available, so previous data will be recapped."
    };
    format!(
        "First, some Covid-19 update. {freshness} \
         In England, there are {} new cases, \
         and unfortunately {} people lost their battle against Covid-19. \
         In total, there are {} cases, \
         and {} lives have been lost in this pandemic.",
        s.new_cases, s.new_deaths, s.cumulative_cases, s.cumulative_deaths
    )
}

pub fn weather_brief(weather: Option<&WeatherReport>) -> String {
    match weather {
        Some(w) => format!(
            "Currently in your location, expect {}. The temperature is {:.1} degrees, \
             and it feels like {:.1}.",
            w.description, w.temperature, w.feels_like
        ),
        None => WEATHER_FALLBACK.to_string(),
    }
}

pub fn news_brief(headlines: &[Headline]) -> String {
    let titles: Vec<&str> = headlines
        .iter()
        .filter_map(|h| h.title.as_deref())
        .filter(|t| !t.trim().is_empty())
        .collect();
    if titles.is_empty() {
        return NO_NEWS.to_string();
    }

    let mut out = String::from("Also, here are some top news headlines for you.");
    for t in titles {
        out.push('\n');
        out.push_str(t);
        out.push_str("; ");
    }
    out
}

/// Alarm action that fetches the sources, composes the briefing and speaks it.
pub struct Briefing {
    sources: Sources,
    speech: Arc<dyn SpeechSink>,
}

impl Briefing {
    pub fn new(sources: Sources, speech: Arc<dyn SpeechSink>) -> Self {
        Self { sources, speech }
    }

    pub async fn compose(&self, meta: &AlarmMeta) -> String {
        let mut parts = vec![greeting(&meta.title)];

        parts.push(stats_brief(&self.sources.stats().await));
        if meta.include_weather {
            parts.push(weather_brief(self.sources.weather().await.as_ref()));
        }
        if meta.include_news {
            parts.push(news_brief(&self.sources.headlines().await));
        }
        parts.push(CLOSING.to_string());

        parts.join("\n")
    }

    /// Compose and speak. Returns the spoken text.
    pub async fn deliver(&self, meta: &AlarmMeta) -> Result<String> {
        let message = self.compose(meta).await;
        info!(target: "briefing", title = %meta.title, "brief message: {message}");
        self.speech
            .speak(&message)
            .await
            .with_context(|| format!("speak briefing `{}`", meta.title))?;
        Ok(message)
    }
}

#[async_trait]
impl AlarmAction for Briefing {
    async fn fire(&self, alarm: &Alarm) -> Result<()> {
        info!(target: "briefing", alarm_id = %alarm.id, fire_at = %alarm.fire_at, "daily brief initiated");
        self.deliver(&alarm.meta).await.map(|_| ())
    }
}
