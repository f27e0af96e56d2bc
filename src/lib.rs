// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod assistant;
pub mod briefing;
pub mod clock;
pub mod config;
pub mod error;
pub mod notifications;
pub mod scheduler;
pub mod sources;
pub mod speech;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::assistant::Assistant;
pub use crate::config::AppConfig;
pub use crate::error::{AlarmError, FetchError, IdentifierError};
pub use crate::notifications::{Notification, NotificationCenter, NotificationId};
pub use crate::scheduler::{Alarm, AlarmAction, AlarmId, AlarmMeta, AlarmScheduler};

/// Install the global tracing subscriber.
/// `RUST_LOG` drives the filter; `BRIEF_LOG_JSON=1` switches to JSON lines.
/// A no-op if a subscriber is already installed (e.g. by the Shuttle runtime).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daily_brief=info,warn"));

    let json = std::env::var("BRIEF_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let res = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Full HTTP app: API routes plus `/metrics` when a recorder is available.
pub fn app(assistant: Arc<Assistant>, metrics: Option<&telemetry::Metrics>) -> Router {
    let router = create_router(AppState::new(assistant));
    match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    }
}
