use std::sync::Arc;

use rum_core::{EpochRange, TimeRange};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::TelemetryError;
use crate::services::{AnalyticsService, IngestionService, QueryService};
use crate::types::BatchResult;

#[derive(Clone)]
pub struct AppState {
    pub ingestion_service: Arc<IngestionService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub query_service: Arc<QueryService>,
}

/// Inclusive window in epoch milliseconds
#[derive(Debug, Clone, Copy, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RangeQuery {
    /// Window start, epoch milliseconds
    pub start_ms: i64,
    /// Window end, epoch milliseconds
    pub end_ms: i64,
}

impl RangeQuery {
    pub fn time_range(self) -> Result<TimeRange, TelemetryError> {
        Ok(TimeRange::try_from(EpochRange {
            start_ms: self.start_ms,
            end_ms: self.end_ms,
        })?)
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NetworkErrorCountQuery {
    /// timeout, failed or aborted
    pub error_type: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    #[schema(example = "success")]
    pub status: String,
    #[schema(example = "Processed 2 events")]
    pub message: String,
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
}

impl From<BatchResult> for IngestResponse {
    fn from(result: BatchResult) -> Self {
        Self {
            status: "success".to_string(),
            message: format!("Processed {} events", result.processed),
            processed: result.processed,
            failed: result.failed,
            total: result.total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "UP")]
    pub status: String,
    #[schema(example = "RUM Backend")]
    pub service: String,
    /// Server clock, epoch milliseconds
    pub timestamp: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkErrorCountResponse {
    pub error_type: String,
    pub count: u64,
}
