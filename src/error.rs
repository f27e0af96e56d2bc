//! Error types for alarms, upstream sources and notification ids.

use crate::scheduler::AlarmId;

/// Errors surfaced by the alarm scheduler.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AlarmError {
    /// The id was never issued, or the alarm already fired or was cancelled.
    #[error("alarm {0} does not exist")]
    NotFound(AlarmId),
}

/// Failure talking to one of the upstream data sources.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network or TLS failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Body could not be decoded into the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Body decoded but lacked the data points we need.
    #[error("missing data: {0}")]
    MissingData(String),
}

/// A headline whose id cannot be derived.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("headline has no string title")]
    MissingTitle,

    #[error("headline has no string description")]
    MissingDescription,
}
