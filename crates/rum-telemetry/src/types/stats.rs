//! Result and snapshot types returned by ingestion and analytics

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::IngestFailure;

/// Per-batch ingestion outcome; `processed + failed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BatchResult {
    pub processed: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchResult {
    /// Fold per-item outcomes into counts.
    pub fn tally<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a Result<(), IngestFailure>>,
    {
        outcomes
            .into_iter()
            .fold(BatchResult::default(), |mut acc, outcome| {
                match outcome {
                    Ok(()) => acc.processed += 1,
                    Err(_) => acc.failed += 1,
                }
                acc.total += 1;
                acc
            })
    }
}

/// Dashboard snapshot for one time window.
///
/// Each figure comes from an independent query, so under concurrent writes the
/// figures may be slightly skewed relative to each other.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Distinct sessions that reported web vitals
    pub unique_sessions: u64,
    /// Distinct users that viewed pages
    pub unique_users: u64,
    pub total_page_views: u64,
    pub total_errors: u64,
    /// Mean page load time in milliseconds, 0 when nothing was recorded
    pub avg_page_load_time: f64,
}

/// Load-time aggregates for one page URL
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedStats {
    pub page_url: Option<String>,
    pub view_count: u64,
    pub avg_load_time: f64,
    pub min_load_time: f64,
    pub max_load_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopPage {
    pub page_path: String,
    pub view_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    /// Milliseconds
    pub avg_time_on_page: f64,
    /// Percent
    pub avg_scroll_depth: f64,
}

/// Clamp an aggregate to a finite, non-negative value; missing data reads as 0.
pub(crate) fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
