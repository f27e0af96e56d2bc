// src/sources/weather.rs
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde::Deserialize;

use super::{WeatherReport, WeatherSource};
use crate::error::FetchError;

pub const OPEN_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainBlock,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    feels_like: f64,
    humidity: f64,
}

impl From<CurrentWeather> for WeatherReport {
    fn from(w: CurrentWeather) -> Self {
        Self {
            description: w
                .weather
                .into_iter()
                .next()
                .map(|c| c.description)
                .unwrap_or_default(),
            temperature: w.main.temp,
            feels_like: w.main.feels_like,
            humidity: w.main.humidity,
        }
    }
}

/// Parse an OpenWeather `/weather` response body.
pub fn parse_current_weather(body: &str) -> Result<WeatherReport, FetchError> {
    serde_json::from_str::<CurrentWeather>(body)
        .map(WeatherReport::from)
        .map_err(|e| FetchError::Parse(format!("openweather: {e}")))
}

/// OpenWeather current-conditions client.
#[derive(Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    api_key: String,
    client: Client,
    timeout: Duration,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: OPEN_WEATHER_API_URL.to_string(),
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

    async fn try_fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherReport, FetchError> {
        let lat = latitude.to_string();
        let lon = longitude.to_string();
        let rsp = self
            .client
            .get(format!("{}/weather", self.base_url))
            .timeout(self.timeout)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = rsp.text().await?;
        parse_current_weather(&body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Option<WeatherReport> {
        super::ensure_metrics_described();
        let t0 = Instant::now();
        let res = self.try_fetch(latitude, longitude).await;
        histogram!("source_fetch_ms", "source" => "weather")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(report) => Some(report),
            Err(e) => {
                counter!("source_errors_total", "source" => "weather").increment(1);
                tracing::warn!(target: "sources", error = %e, "weather fetch failed");
                None
            }
        }
    }
}
