//! daily-brief: binary entrypoint.
//! Boots the Axum HTTP server, wiring config, the assistant, the alarm dispatcher
//! and metrics.

use std::sync::Arc;

use daily_brief::{telemetry::Metrics, AppConfig, Assistant};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    daily_brief::init_tracing();

    let cfg = AppConfig::load_default()?;
    tracing::info!(
        country = %cfg.location.country,
        latitude = cfg.location.latitude,
        longitude = cfg.location.longitude,
        "config loaded"
    );

    let assistant = Arc::new(Assistant::from_config(&cfg));
    // Detached: the dispatcher lives as long as the runtime.
    let _dispatcher = assistant.start();

    let metrics = match Metrics::init() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let router = daily_brief::app(assistant, metrics.as_ref());
    Ok(router.into())
}
