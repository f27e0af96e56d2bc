//! # Notification feed
//! Merges freshly fetched weather, statistics and news into a stable feed.
//!
//! - Weather lives under the fixed id `weather` and is overwritten on every refresh.
//! - Statistics live under `covid-<date>-<new+cumulative>`; a new id replaces the old one.
//! - Headlines get a content-derived id and are inserted once.
//! - Removing a notification suppresses its id for the life of the process.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use metrics::counter;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::IdentifierError;
use crate::sources::{CaseSummary, Headline, Sources, WeatherReport};

pub const WEATHER_ID: &str = "weather";
pub const STATS_ID_PREFIX: &str = "covid-";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    /// May contain `<br>` line breaks for display.
    pub content: String,
}

/// Deterministic, case-insensitive id for a (title, description) pair.
pub fn news_id_for(title: &str, description: &str) -> NotificationId {
    let mut hasher = Sha256::new();
    hasher.update(title.to_lowercase().as_bytes());
    hasher.update([0x1f]);
    hasher.update(description.to_lowercase().as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(18);
    out.push_str("n-");
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    NotificationId(out)
}

pub fn news_id(headline: &Headline) -> Result<NotificationId, IdentifierError> {
    let title = headline
        .title
        .as_deref()
        .ok_or(IdentifierError::MissingTitle)?;
    let description = headline
        .description
        .as_deref()
        .ok_or(IdentifierError::MissingDescription)?;
    Ok(news_id_for(title, description))
}

/// Changes whenever the underlying figures change. Upstream counts are untrusted,
/// so the sum saturates instead of overflowing.
pub fn stats_id(summary: &CaseSummary) -> NotificationId {
    NotificationId(format!(
        "{STATS_ID_PREFIX}{}-{}",
        summary.as_of.format("%Y-%m-%d"),
        summary.new_cases.saturating_add(summary.cumulative_cases)
    ))
}

pub fn weather_notification(report: &WeatherReport) -> Notification {
    let mut content = String::new();
    if !report.description.is_empty() {
        content.push_str(&html_escape::encode_text(&report.description));
        content.push_str("<br>");
    }
    content.push_str(&format!(
        "Temperature: {:.1}°C<br>Feels like: {:.1}°C<br>Humidity: {:.0}%",
        report.temperature, report.feels_like, report.humidity
    ));
    Notification {
        id: NotificationId::from(WEATHER_ID),
        title: "Current weather".to_string(),
        content,
    }
}

pub fn stats_notification(summary: &CaseSummary) -> Notification {
    let mut content = format!(
        "New cases: {}<br>Total cases: {}<br>New deaths: {}<br>Total deaths: {}<br>As of {}",
        summary.new_cases,
        summary.cumulative_cases,
        summary.new_deaths,
        summary.cumulative_deaths,
        summary.as_of.format("%Y-%m-%d"),
    );
    if !summary.is_latest {
        content.push_str(" (today's figures are not published yet)");
    }
    Notification {
        id: stats_id(summary),
        title: "Covid-19 in England".to_string(),
        content,
    }
}

#[derive(Debug, Default)]
struct Feed {
    items: BTreeMap<NotificationId, Notification>,
    suppressed: HashSet<NotificationId>,
    stats_id: Option<NotificationId>,
}

impl Feed {
    fn is_suppressed(&self, id: &NotificationId) -> bool {
        if self.suppressed.contains(id) {
            counter!("notifications_suppressed_total").increment(1);
            return true;
        }
        false
    }

    fn upsert(&mut self, n: Notification) {
        if self.is_suppressed(&n.id) {
            return;
        }
        self.items.insert(n.id.clone(), n);
    }

    fn replace_stats(&mut self, n: Notification) {
        if let Some(old) = self.stats_id.take() {
            if old != n.id {
                self.items.remove(&old);
            }
        }
        if self.is_suppressed(&n.id) {
            return;
        }
        self.stats_id = Some(n.id.clone());
        self.items.insert(n.id.clone(), n);
    }

    fn merge_headline(&mut self, headline: Headline) -> bool {
        let id = match news_id(&headline) {
            Ok(id) => id,
            Err(e) => {
                warn!(target: "notifications", error = %e, ?headline, "skipping headline");
                return false;
            }
        };
        if self.items.contains_key(&id) || self.is_suppressed(&id) {
            return false;
        }

        let n = Notification {
            id: id.clone(),
            title: headline.title.unwrap_or_default(),
            content: headline.description.unwrap_or_default(),
        };
        self.items.insert(id, n);
        true
    }

    fn values(&self) -> Vec<Notification> {
        self.items.values().cloned().collect()
    }
}

/// Shared notification feed. Refreshes are serialized by one async lock.
pub struct NotificationCenter {
    sources: Sources,
    feed: Mutex<Feed>,
}

impl NotificationCenter {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            feed: Mutex::new(Feed::default()),
        }
    }

    /// Current notifications ordered by id. With `refresh`, re-fetch sources first.
    pub async fn list(&self, refresh: bool) -> Vec<Notification> {
        let mut feed = self.feed.lock().await;
        if refresh {
            self.refresh(&mut feed).await;
        }
        feed.values()
    }

    async fn refresh(&self, feed: &mut Feed) {
        counter!("notifications_refresh_total").increment(1);

        match self.sources.weather().await {
            Some(report) => feed.upsert(weather_notification(&report)),
            None => debug!(target: "notifications", "weather unavailable, keeping previous"),
        }

        match self.sources.stats().await {
            Ok(summary) => feed.replace_stats(stats_notification(&summary)),
            Err(e) => {
                warn!(target: "notifications", error = %e, "statistics unavailable, keeping previous")
            }
        }

        let mut inserted = 0u64;
        for headline in self.sources.headlines().await {
            if feed.merge_headline(headline) {
                inserted += 1;
            }
        }
        counter!("notifications_inserted_total").increment(inserted);
        info!(
            target: "notifications",
            inserted,
            total = feed.items.len(),
            suppressed = feed.suppressed.len(),
            "feed refreshed"
        );
    }

    /// Dismiss the first notification with exactly this title. Its id is never
    /// re-added. Unknown titles are ignored.
    pub async fn remove(&self, title: &str) -> Option<NotificationId> {
        let mut feed = self.feed.lock().await;
        let id = feed
            .items
            .iter()
            .find(|(_, n)| n.title == title)
            .map(|(id, _)| id.clone())?;

        feed.items.remove(&id);
        feed.suppressed.insert(id.clone());
        info!(target: "notifications", %id, title, "notification dismissed");
        Some(id)
    }

    pub async fn suppressed(&self) -> Vec<NotificationId> {
        let feed = self.feed.lock().await;
        let mut ids: Vec<_> = feed.suppressed.iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summary(date: &str, new_cases: u64, cumulative_cases: u64) -> CaseSummary {
        CaseSummary {
            is_latest: true,
            as_of: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            new_cases,
            cumulative_cases,
            new_deaths: 1,
            cumulative_deaths: 2,
        }
    }

    #[test]
    fn news_id_is_deterministic_and_case_insensitive() {
        let a = news_id_for("Storm Hits Devon", "Trains cancelled");
        assert_eq!(a, news_id_for("Storm Hits Devon", "Trains cancelled"));
        assert_eq!(a, news_id_for("storm hits devon", "TRAINS CANCELLED"));
        assert_ne!(a, news_id_for("Storm Hits Devon", "Trains delayed"));
        assert!(a.as_str().starts_with("n-"));
    }

    #[test]
    fn title_and_description_boundary_matters() {
        assert_ne!(news_id_for("ab", "c"), news_id_for("a", "bc"));
    }

    #[test]
    fn news_id_rejects_missing_fields() {
        let no_title = Headline {
            title: None,
            description: Some("d".into()),
        };
        let no_desc = Headline {
            title: Some("t".into()),
            description: None,
        };
        assert_eq!(news_id(&no_title), Err(IdentifierError::MissingTitle));
        assert_eq!(news_id(&no_desc), Err(IdentifierError::MissingDescription));
    }

    #[test]
    fn stats_id_tracks_date_and_counts() {
        let s = summary("2020-07-28", 547, 259022);
        assert_eq!(stats_id(&s).as_str(), "covid-2020-07-28-259569");
        assert_ne!(stats_id(&s), stats_id(&summary("2020-07-28", 548, 259022)));
    }

    #[test]
    fn stats_id_saturates_on_huge_counts() {
        let s = summary("2020-07-28", u64::MAX, 1);
        assert_eq!(
            stats_id(&s).as_str(),
            format!("covid-2020-07-28-{}", u64::MAX)
        );
    }

    #[tokio::test]
    async fn refresh_survives_overflowing_stats() {
        use crate::sources::fixture::{FixedNews, FixedStats, FixedWeather};
        use crate::sources::Location;
        use std::sync::Arc;

        let center = NotificationCenter::new(Sources::new(
            Arc::new(FixedWeather::default()),
            Arc::new(FixedNews::from_fixture(vec![Headline::new("t", "d")])),
            Arc::new(FixedStats::from_fixture(Some(summary(
                "2020-07-28",
                u64::MAX,
                1,
            )))),
            Location::default(),
        ));

        let ns = center.list(true).await;
        assert_eq!(ns.len(), 2);
        assert!(ns.iter().any(|n| n.title == "t"));
        assert!(ns.iter().any(|n| n.id.as_str().starts_with(STATS_ID_PREFIX)));
    }

    #[test]
    fn weather_content_lists_temperatures_and_humidity() {
        let n = weather_notification(&WeatherReport {
            description: "light rain".into(),
            temperature: 12.0,
            feels_like: 10.3,
            humidity: 100.0,
        });
        assert_eq!(n.id.as_str(), WEATHER_ID);
        assert_eq!(
            n.content,
            "light rain<br>Temperature: 12.0°C<br>Feels like: 10.3°C<br>Humidity: 100%"
        );
    }

    #[test]
    fn replacing_stats_keeps_one_live_entry() {
        let mut feed = Feed::default();
        feed.replace_stats(stats_notification(&summary("2020-07-27", 616, 258475)));
        feed.replace_stats(stats_notification(&summary("2020-07-28", 547, 259022)));

        let ids: Vec<_> = feed.items.keys().map(|k| k.as_str().to_string()).collect();
        assert_eq!(ids, vec!["covid-2020-07-28-259569"]);
    }

    #[test]
    fn suppressed_singleton_is_not_reinserted() {
        let mut feed = Feed::default();
        feed.suppressed.insert(NotificationId::from(WEATHER_ID));
        feed.upsert(weather_notification(&WeatherReport {
            description: String::new(),
            temperature: 1.0,
            feels_like: 1.0,
            humidity: 1.0,
        }));
        assert!(feed.items.is_empty());
    }
}
