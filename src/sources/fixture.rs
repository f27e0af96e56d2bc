// src/sources/fixture.rs
//! In-memory sources for offline runs and tests. Contents can be swapped between
//! fetches to simulate upstream changes.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{CaseSummary, Headline, NewsSource, StatsSource, WeatherReport, WeatherSource};
use crate::error::FetchError;

#[derive(Debug, Default)]
pub struct FixedWeather {
    report: Mutex<Option<WeatherReport>>,
}

impl FixedWeather {
    pub fn from_fixture(report: Option<WeatherReport>) -> Self {
        Self {
            report: Mutex::new(report),
        }
    }

    pub fn set(&self, report: Option<WeatherReport>) {
        *self.report.lock().expect("fixture mutex poisoned") = report;
    }
}

#[async_trait]
impl WeatherSource for FixedWeather {
    async fn fetch(&self, _latitude: f64, _longitude: f64) -> Option<WeatherReport> {
        self.report.lock().expect("fixture mutex poisoned").clone()
    }
}

#[derive(Debug, Default)]
pub struct FixedNews {
    headlines: Mutex<Vec<Headline>>,
}

impl FixedNews {
    pub fn from_fixture(headlines: Vec<Headline>) -> Self {
        Self {
            headlines: Mutex::new(headlines),
        }
    }

    pub fn set(&self, headlines: Vec<Headline>) {
        *self.headlines.lock().expect("fixture mutex poisoned") = headlines;
    }
}

#[async_trait]
impl NewsSource for FixedNews {
    async fn fetch(&self, _country: &str) -> Vec<Headline> {
        self.headlines.lock().expect("fixture mutex poisoned").clone()
    }
}

/// `None` simulates an upstream outage (HTTP 503).
#[derive(Debug, Default)]
pub struct FixedStats {
    summary: Mutex<Option<CaseSummary>>,
}

impl FixedStats {
    pub fn from_fixture(summary: Option<CaseSummary>) -> Self {
        Self {
            summary: Mutex::new(summary),
        }
    }

    pub fn unavailable() -> Self {
        Self::from_fixture(None)
    }

    pub fn set(&self, summary: Option<CaseSummary>) {
        *self.summary.lock().expect("fixture mutex poisoned") = summary;
    }
}

#[async_trait]
impl StatsSource for FixedStats {
    async fn fetch(&self) -> Result<CaseSummary, FetchError> {
        self.summary
            .lock()
            .expect("fixture mutex poisoned")
            .clone()
            .ok_or(FetchError::Status(503))
    }
}
