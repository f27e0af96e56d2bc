// src/sources/news.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{normalize_text, Headline, NewsSource};
use crate::error::FetchError;

pub const NEWS_API_URL: &str = "https://newsapi.org";

#[derive(Debug, Deserialize)]
struct TopHeadlines {
    #[serde(default)]
    articles: Vec<Article>,
}

/// Kept loose: NewsAPI sends `null` descriptions and we must not reject the page for it.
#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: Value,
    #[serde(default)]
    description: Value,
}

fn text_field(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(normalize_text(&s)),
        _ => None,
    }
}

/// Parse a NewsAPI `/v2/top-headlines` response body.
pub fn parse_top_headlines(body: &str) -> Result<Vec<Headline>, FetchError> {
    let page: TopHeadlines =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("newsapi: {e}")))?;
    Ok(page
        .articles
        .into_iter()
        .map(|a| Headline {
            title: text_field(a.title),
            description: text_field(a.description),
        })
        .collect())
}

/// NewsAPI top-headlines client.
#[derive(Clone)]
pub struct NewsApiClient {
    base_url: String,
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: NEWS_API_URL.to_string(),
            api_key,
            client: Client::new(),
            timeout: Duration::from_secs(10),
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

    async fn try_fetch(&self, country: &str) -> Result<Vec<Headline>, FetchError> {
        let rsp = self
            .client
            .get(format!("{}/v2/top-headlines", self.base_url))
            .timeout(self.timeout)
            .query(&[("country", country), ("apiKey", self.api_key.as_str())])
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = rsp.text().await?;
        parse_top_headlines(&body)
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    async fn fetch(&self, country: &str) -> Vec<Headline> {
        super::ensure_metrics_described();
        let t0 = Instant::now();
        let res = self.try_fetch(country).await;
        histogram!("source_fetch_ms", "source" => "news")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(headlines) => headlines,
            Err(e) => {
                counter!("source_errors_total", "source" => "news").increment(1);
                tracing::warn!(target: "sources", error = %e, country, "news fetch failed");
                Vec::new()
            }
        }
    }
}
