//! Error types for telemetry ingestion and queries

use rum_core::problemdetails::Problem;
use rum_core::{bad_request, internal_server_error, TimestampOutOfRange};
use thiserror::Error;

use crate::store::StoreError;

/// Why a single batch item was not persisted.
///
/// These never escape the dispatcher; each one is logged and counted as failed.
#[derive(Error, Debug)]
pub enum IngestFailure {
    #[error("Event has no type")]
    MissingEventType,

    #[error("Unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("Malformed {event_type} event: {reason}")]
    MalformedItem {
        event_type: &'static str,
        reason: String,
    },

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(#[from] TimestampOutOfRange),

    #[error("Failed to persist {event_type} event: {source}")]
    Persistence {
        event_type: &'static str,
        #[source]
        source: StoreError,
    },
}

impl IngestFailure {
    /// Stable label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            IngestFailure::MissingEventType => "missing_event_type",
            IngestFailure::UnknownEventType(_) => "unknown_event_type",
            IngestFailure::MalformedItem { .. } => "malformed_item",
            IngestFailure::InvalidTimestamp(_) => "invalid_timestamp",
            IngestFailure::Persistence { .. } => "persistence_failure",
        }
    }
}

/// Request-level failures surfaced to HTTP callers
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Empty event batch")]
    EmptyBatch,

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(#[from] TimestampOutOfRange),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<TelemetryError> for Problem {
    fn from(error: TelemetryError) -> Self {
        match error {
            TelemetryError::EmptyBatch => bad_request()
                .title("Empty Batch")
                .detail("Empty event batch")
                .build(),

            TelemetryError::InvalidTimeRange(e) => bad_request()
                .title("Invalid Time Range")
                .detail(e.to_string())
                .build(),

            TelemetryError::Store(e) => internal_server_error()
                .title("Storage Error")
                .detail(e.to_string())
                .build(),
        }
    }
}
