use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the scheduler/feed series.
    /// Fails if a global recorder is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("alarms_scheduled_total", "Alarms accepted by the scheduler.");
        describe_counter!("alarms_cancelled_total", "Alarms cancelled before firing.");
        describe_counter!("alarms_fired_total", "Alarms handed to their action.");
        describe_counter!(
            "alarm_failures_total",
            "Alarm actions that returned an error or panicked."
        );
        describe_counter!("notifications_refresh_total", "Feed refreshes performed.");
        describe_counter!(
            "notifications_inserted_total",
            "News notifications added to the feed."
        );
        describe_counter!(
            "notifications_suppressed_total",
            "Inserts skipped because the user dismissed that id."
        );
        crate::sources::ensure_metrics_described();

        gauge!("process_start_ts").set(chrono::Utc::now().timestamp() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
