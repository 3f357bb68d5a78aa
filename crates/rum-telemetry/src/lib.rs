//! Browser telemetry (RUM) ingestion and dashboard analytics
//!
//! A batch of untyped envelopes is classified into [`TelemetryEvent`]s, each one is
//! normalised and persisted through its kind's store, and the outcome is tallied
//! into a [`BatchResult`]. Read paths query the stores directly.

pub mod error;
pub mod handlers;
pub mod plugin;
pub mod services;
pub mod store;
pub mod types;

pub use error::{IngestFailure, TelemetryError};
pub use handlers::handler;
pub use services::*;
pub use store::{StoreError, TelemetryStores};
pub use types::*;

pub use plugin::TelemetryPlugin;
