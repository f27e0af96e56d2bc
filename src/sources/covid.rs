// src/sources/covid.rs
//! Client for the UK coronavirus dashboard API (England, nation level).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;

use super::{CaseSummary, StatsSource};
use crate::error::FetchError;

pub const COVID_API_URL: &str = "https://api.coronavirus.data.gov.uk/v1/data";

const ENGLAND_FILTER: &str = "areaType=nation;areaName=England";

const STRUCTURE: &str = r#"{"date":"date","areaName":"areaName","areaCode":"areaCode","newCasesByPublishDate":"newCasesByPublishDate","cumCasesByPublishDate":"cumCasesByPublishDate","newDeathsByDeathDate":"newDeathsByDeathDate","cumDeathsByDeathDate":"cumDeathsByDeathDate"}"#;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<DataPoint>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataPoint {
    date: Option<String>,
    new_cases_by_publish_date: Option<u64>,
    cum_cases_by_publish_date: Option<u64>,
    new_deaths_by_death_date: Option<u64>,
    cum_deaths_by_death_date: Option<u64>,
}

/// Parse a dashboard response. Points arrive newest first; the newest supplies the
/// date and case counts, the one before it the death counts.
pub fn parse_summary(body: &str, today: NaiveDate) -> Result<CaseSummary, FetchError> {
    let page: Page =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("covid: {e}")))?;

    let mut points = page.data.into_iter();
    let (Some(latest), Some(previous)) = (points.next(), points.next()) else {
        return Err(FetchError::MissingData(
            "expected at least two data points".into(),
        ));
    };

    let as_of = latest
        .date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, DATE_FORMAT).ok())
        .ok_or_else(|| FetchError::MissingData("latest data point has no valid date".into()))?;

    Ok(CaseSummary {
        is_latest: as_of == today,
        as_of,
        new_cases: latest.new_cases_by_publish_date.unwrap_or(0),
        cumulative_cases: latest.cum_cases_by_publish_date.unwrap_or(0),
        new_deaths: previous.new_deaths_by_death_date.unwrap_or(0),
        cumulative_deaths: previous.cum_deaths_by_death_date.unwrap_or(0),
    })
}

#[derive(Clone)]
pub struct CovidApiClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl Default for CovidApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CovidApiClient {
    pub fn new() -> Self {
        Self {
            base_url: COVID_API_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(15),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn try_fetch(&self) -> Result<CaseSummary, FetchError> {
        let rsp = self
            .client
            .get(&self.base_url)
            .timeout(self.timeout)
            .query(&[("filters", ENGLAND_FILTER), ("structure", STRUCTURE)])
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = rsp.text().await?;
        parse_summary(&body, Utc::now().date_naive())
    }
}

#[async_trait]
impl StatsSource for CovidApiClient {
    async fn fetch(&self) -> Result<CaseSummary, FetchError> {
        super::ensure_metrics_described();
        let t0 = Instant::now();
        let res = self.try_fetch().await;
        histogram!("source_fetch_ms", "source" => "covid")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Err(e) = &res {
            counter!("source_errors_total", "source" => "covid").increment(1);
            tracing::error!(target: "sources", error = %e, "covid statistics fetch failed");
        }
        res
    }
}
