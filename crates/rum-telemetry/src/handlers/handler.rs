use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use rum_core::problemdetails::Problem;
use rum_core::ProblemDetails;
use rum_entities::{error_events, page_speed_events, page_view_events, web_vital_events};
use serde_json::Value;
use tracing::error;
use utoipa::OpenApi;

use super::types::{
    AppState, HealthResponse, IngestResponse, NetworkErrorCountQuery, NetworkErrorCountResponse,
    RangeQuery,
};
use crate::error::TelemetryError;
use crate::types::{DashboardStats, EngagementStats, PageSpeedStats, TopPage, WebVitalMetric};

#[derive(OpenApi)]
#[openapi(
    paths(
        ingest_events,
        get_session_vitals,
        get_session_errors,
        get_vitals_by_range,
        get_vitals_by_metric_and_range,
        get_vitals_by_metric,
        get_errors_by_range,
        get_errors_by_type,
        get_page_views_by_range,
        get_page_speed_by_range,
        get_page_speed_stats,
        get_dashboard_stats,
        get_top_pages,
        get_engagement_stats,
        get_network_error_count,
        health,
    ),
    components(schemas(
        IngestResponse,
        HealthResponse,
        NetworkErrorCountResponse,
        RangeQuery,
        NetworkErrorCountQuery,
        DashboardStats,
        PageSpeedStats,
        TopPage,
        EngagementStats,
        WebVitalMetric,
        ProblemDetails,
        web_vital_events::Model,
        error_events::Model,
        page_view_events::Model,
        page_speed_events::Model,
    )),
    tags(
        (name = "rum", description = "Browser telemetry ingestion and dashboard statistics")
    )
)]
pub struct TelemetryApiDoc;

pub fn configure_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(ingest_events))
        .route("/ingest", post(ingest_events))
        .route("/sessions/{session_id}/vitals", get(get_session_vitals))
        .route("/sessions/{session_id}/errors", get(get_session_errors))
        .route("/vitals/range", get(get_vitals_by_range))
        .route("/vitals/{metric_name}", get(get_vitals_by_metric))
        .route("/vitals/{metric_name}/range", get(get_vitals_by_metric_and_range))
        .route("/errors/range", get(get_errors_by_range))
        .route("/errors/types/{error_type}", get(get_errors_by_type))
        .route("/pageviews/range", get(get_page_views_by_range))
        .route("/pageviews/top", get(get_top_pages))
        .route("/pagespeed/range", get(get_page_speed_by_range))
        .route("/pagespeed/stats", get(get_page_speed_stats))
        .route("/stats", get(get_dashboard_stats))
        .route("/engagement/stats", get(get_engagement_stats))
        .route("/network-errors/count", get(get_network_error_count))
        .route("/health", get(health))
}

fn log_failure(operation: &str, e: TelemetryError) -> Problem {
    if matches!(e, TelemetryError::Store(_)) {
        error!("{} failed: {}", operation, e);
    }
    e.into()
}

/// Ingest a batch of telemetry envelopes
///
/// Every item is classified and stored independently. Items that fail are
/// counted, so any non-empty batch answers 200 with the tally.
#[utoipa::path(
    post,
    path = "/ingest",
    request_body(content = Vec<serde_json::Value>, description = "Array of telemetry envelopes"),
    responses(
        (status = 200, description = "Batch processed", body = IngestResponse),
        (status = 400, description = "Empty batch", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn ingest_events(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> Result<Json<IngestResponse>, Problem> {
    let result = state
        .ingestion_service
        .ingest(batch)
        .await
        .map_err(|e| log_failure("Ingestion", e))?;

    Ok(Json(result.into()))
}

/// Web vitals recorded for one session
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/vitals",
    params(("session_id" = String, Path, description = "Client session identifier")),
    responses(
        (status = 200, description = "Web vitals of the session", body = Vec<web_vital_events::Model>),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_session_vitals(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<web_vital_events::Model>>, Problem> {
    let vitals = state
        .query_service
        .vitals_by_session(&session_id)
        .await
        .map_err(|e| log_failure("Session vitals query", e))?;
    Ok(Json(vitals))
}

/// Errors recorded for one session
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/errors",
    params(("session_id" = String, Path, description = "Client session identifier")),
    responses(
        (status = 200, description = "Errors of the session", body = Vec<error_events::Model>),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_session_errors(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<error_events::Model>>, Problem> {
    let errors = state
        .query_service
        .errors_by_session(&session_id)
        .await
        .map_err(|e| log_failure("Session errors query", e))?;
    Ok(Json(errors))
}

#[utoipa::path(
    get,
    path = "/vitals/range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Web vitals in the window", body = Vec<web_vital_events::Model>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_vitals_by_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<web_vital_events::Model>>, Problem> {
    let range = query.time_range()?;
    let vitals = state
        .query_service
        .vitals_in_range(range)
        .await
        .map_err(|e| log_failure("Web vitals range query", e))?;
    Ok(Json(vitals))
}

/// Web vitals of one metric (LCP, FCP, CLS, INP, TTFB) in the window
#[utoipa::path(
    get,
    path = "/vitals/{metric_name}/range",
    params(
        ("metric_name" = String, Path, description = "Metric name, e.g. LCP"),
        RangeQuery
    ),
    responses(
        (status = 200, description = "Web vitals of the metric in the window", body = Vec<web_vital_events::Model>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_vitals_by_metric_and_range(
    State(state): State<Arc<AppState>>,
    Path(metric_name): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<web_vital_events::Model>>, Problem> {
    let range = query.time_range()?;
    let vitals = state
        .query_service
        .vitals_by_metric_in_range(&metric_name, range)
        .await
        .map_err(|e| log_failure("Web vitals metric query", e))?;
    Ok(Json(vitals))
}

/// Every recorded web vital of one metric
#[utoipa::path(
    get,
    path = "/vitals/{metric_name}",
    params(("metric_name" = String, Path, description = "Metric name, e.g. LCP")),
    responses(
        (status = 200, description = "Web vitals of the metric", body = Vec<web_vital_events::Model>),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_vitals_by_metric(
    State(state): State<Arc<AppState>>,
    Path(metric_name): Path<String>,
) -> Result<Json<Vec<web_vital_events::Model>>, Problem> {
    let vitals = state
        .query_service
        .vitals_by_metric(&metric_name)
        .await
        .map_err(|e| log_failure("Web vitals metric query", e))?;
    Ok(Json(vitals))
}

#[utoipa::path(
    get,
    path = "/errors/range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Errors in the window", body = Vec<error_events::Model>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_errors_by_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<error_events::Model>>, Problem> {
    let range = query.time_range()?;
    let errors = state
        .query_service
        .errors_in_range(range)
        .await
        .map_err(|e| log_failure("Errors range query", e))?;
    Ok(Json(errors))
}

/// Errors of one type, e.g. javascript or promise
#[utoipa::path(
    get,
    path = "/errors/types/{error_type}",
    params(("error_type" = String, Path, description = "Client error type")),
    responses(
        (status = 200, description = "Errors of the type", body = Vec<error_events::Model>),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_errors_by_type(
    State(state): State<Arc<AppState>>,
    Path(error_type): Path<String>,
) -> Result<Json<Vec<error_events::Model>>, Problem> {
    let errors = state
        .query_service
        .errors_by_type(&error_type)
        .await
        .map_err(|e| log_failure("Errors by type query", e))?;
    Ok(Json(errors))
}

/// Page views in the window, newest first
#[utoipa::path(
    get,
    path = "/pageviews/range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Page views in the window", body = Vec<page_view_events::Model>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_page_views_by_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<page_view_events::Model>>, Problem> {
    let range = query.time_range()?;
    let views = state
        .query_service
        .page_views_in_range(range)
        .await
        .map_err(|e| log_failure("Page views range query", e))?;
    Ok(Json(views))
}

/// Most viewed page paths in the window
#[utoipa::path(
    get,
    path = "/pageviews/top",
    params(RangeQuery),
    responses(
        (status = 200, description = "Page paths by view count", body = Vec<TopPage>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_top_pages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<TopPage>>, Problem> {
    let range = query.time_range()?;
    let pages = state
        .analytics_service
        .top_pages(range)
        .await
        .map_err(|e| log_failure("Top pages query", e))?;
    Ok(Json(pages))
}

/// Page speed samples in the window, newest first
#[utoipa::path(
    get,
    path = "/pagespeed/range",
    params(RangeQuery),
    responses(
        (status = 200, description = "Page speed samples in the window", body = Vec<page_speed_events::Model>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_page_speed_by_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<page_speed_events::Model>>, Problem> {
    let range = query.time_range()?;
    let samples = state
        .query_service
        .page_speed_in_range(range)
        .await
        .map_err(|e| log_failure("Page speed range query", e))?;
    Ok(Json(samples))
}

/// Load-time aggregates per page URL, highest view count first
#[utoipa::path(
    get,
    path = "/pagespeed/stats",
    params(RangeQuery),
    responses(
        (status = 200, description = "Per-page load-time aggregates", body = Vec<PageSpeedStats>),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_page_speed_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<PageSpeedStats>>, Problem> {
    let range = query.time_range()?;
    let stats = state
        .analytics_service
        .page_speed_stats(range)
        .await
        .map_err(|e| log_failure("Page speed stats", e))?;
    Ok(Json(stats))
}

/// Dashboard snapshot for the window
#[utoipa::path(
    get,
    path = "/stats",
    params(RangeQuery),
    responses(
        (status = 200, description = "Dashboard snapshot", body = DashboardStats),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_dashboard_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<DashboardStats>, Problem> {
    let range = query.time_range()?;
    let stats = state
        .analytics_service
        .dashboard_stats(range)
        .await
        .map_err(|e| log_failure("Dashboard stats", e))?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/engagement/stats",
    params(RangeQuery),
    responses(
        (status = 200, description = "Average time on page and scroll depth", body = EngagementStats),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_engagement_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<EngagementStats>, Problem> {
    let range = query.time_range()?;
    let stats = state
        .analytics_service
        .engagement_stats(range)
        .await
        .map_err(|e| log_failure("Engagement stats", e))?;
    Ok(Json(stats))
}

/// Number of network errors of one type in the window
#[utoipa::path(
    get,
    path = "/network-errors/count",
    params(NetworkErrorCountQuery),
    responses(
        (status = 200, description = "Network error count", body = NetworkErrorCountResponse),
        (status = 400, description = "Missing window or timestamp outside years 0 to 9999", body = ProblemDetails),
        (status = 500, description = "Internal server error", body = ProblemDetails)
    ),
    tag = "rum"
)]
pub async fn get_network_error_count(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NetworkErrorCountQuery>,
) -> Result<Json<NetworkErrorCountResponse>, Problem> {
    let range = RangeQuery {
        start_ms: query.start_ms,
        end_ms: query.end_ms,
    }
    .time_range()?;
    let count = state
        .analytics_service
        .network_error_count(&query.error_type, range)
        .await
        .map_err(|e| log_failure("Network error count", e))?;

    Ok(Json(NetworkErrorCountResponse {
        error_type: query.error_type,
        count,
    }))
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "rum"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        service: "RUM Backend".to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}
