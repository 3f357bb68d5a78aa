//! Core utilities and types shared across all RUM crates

pub mod config;
pub mod error;
pub mod error_builder;
pub mod plugin;
pub mod problemdetails;
pub use problemdetails::ProblemDetails;
pub mod types;

// Re-export commonly used types
pub use config::*;
pub use error::*;
pub use error_builder::*;
pub use types::*;

// Re-export external dependencies
pub use anyhow;
pub use async_trait;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tokio;
pub use tracing;

// Re-export standard datetime type for use across all crates
pub use types::UtcDateTime;
