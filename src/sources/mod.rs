// src/sources/mod.rs
//! Upstream data sources: weather, news headlines and case statistics.
//!
//! Weather and news degrade to empty output on failure; statistics return the error
//! so the caller can choose a fallback.

pub mod covid;
pub mod fixture;
pub mod news;
pub mod weather;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Current conditions, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
}

/// A news headline. Fields are `None` when upstream sent something other than a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headline {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Headline {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
        }
    }
}

/// Latest case statistics. Death counts come from the day before `as_of`,
/// since same-day death figures lag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub is_latest: bool,
    pub as_of: NaiveDate,
    pub new_cases: u64,
    pub cumulative_cases: u64,
    pub new_deaths: u64,
    pub cumulative_deaths: u64,
}

/// Where the user is: weather coordinates and the ISO 3166-1 country for news.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
}

impl Default for Location {
    fn default() -> Self {
        // Exeter, UK
        Self {
            latitude: 50.718410,
            longitude: -3.533899,
            country: "gb".to_string(),
        }
    }
}

/// The three upstream collaborators plus the location they are queried for.
#[derive(Clone)]
pub struct Sources {
    pub weather: Arc<dyn WeatherSource>,
    pub news: Arc<dyn NewsSource>,
    pub stats: Arc<dyn StatsSource>,
    pub location: Location,
}

impl Sources {
    pub fn new(
        weather: Arc<dyn WeatherSource>,
        news: Arc<dyn NewsSource>,
        stats: Arc<dyn StatsSource>,
        location: Location,
    ) -> Self {
        Self {
            weather,
            news,
            stats,
            location,
        }
    }

    pub async fn weather(&self) -> Option<WeatherReport> {
        self.weather
            .fetch(self.location.latitude, self.location.longitude)
            .await
    }

    pub async fn headlines(&self) -> Vec<Headline> {
        self.news.fetch(&self.location.country).await
    }

    pub async fn stats(&self) -> Result<CaseSummary, FetchError> {
        self.stats.fetch().await
    }
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// `None` on any transport or parse failure.
    async fn fetch(&self, latitude: f64, longitude: f64) -> Option<WeatherReport>;
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Empty on any transport or parse failure.
    async fn fetch(&self, country: &str) -> Vec<Headline>;
}

#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn fetch(&self) -> Result<CaseSummary, FetchError>;
}

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "source_errors_total",
            "Upstream fetch/parse errors, labelled by source."
        );
        describe_histogram!("source_fetch_ms", "Upstream fetch time in milliseconds.");
    });
}

/// Normalize upstream text: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_tags_and_entities() {
        let s = "  <b>Storm</b>&nbsp;&nbsp;warning\n for  \u{201C}Devon\u{201D} ";
        assert_eq!(normalize_text(s), "Storm warning for \"Devon\"");
    }

    #[test]
    fn normalize_text_keeps_punctuation() {
        assert_eq!(normalize_text("Rates rise!"), "Rates rise!");
    }
}
