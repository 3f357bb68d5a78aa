pub mod handler;
pub mod types;

pub use handler::{configure_routes, TelemetryApiDoc};
pub use types::AppState;
