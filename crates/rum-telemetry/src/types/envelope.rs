//! Wire envelopes and their classification into typed events

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::IngestFailure;

/// Common envelope fields plus the kind-specific `data` payload.
///
/// `type` is consumed by [`TelemetryEvent::classify`] and is not repeated here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Client clock, epoch milliseconds
    pub timestamp: i64,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub page_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub data: T,
}

/// The eight event kinds, plus whatever else a client sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    WebVital,
    Error,
    PageView,
    PageSpeed,
    Engagement,
    NetworkError,
    ResourcePerformance,
    UserAction,
    Unrecognized(String),
}

impl EventType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "webVital" => EventType::WebVital,
            "error" => EventType::Error,
            "pageView" => EventType::PageView,
            "pageSpeed" => EventType::PageSpeed,
            "engagement" => EventType::Engagement,
            "networkError" => EventType::NetworkError,
            "resourcePerformance" => EventType::ResourcePerformance,
            "userAction" => EventType::UserAction,
            other => EventType::Unrecognized(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebVitalMetric {
    Lcp,
    Fcp,
    Cls,
    Inp,
    Ttfb,
}

impl WebVitalMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebVitalMetric::Lcp => "LCP",
            WebVitalMetric::Fcp => "FCP",
            WebVitalMetric::Cls => "CLS",
            WebVitalMetric::Inp => "INP",
            WebVitalMetric::Ttfb => "TTFB",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebVitalData {
    pub name: WebVitalMetric,
    pub value: f64,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub navigation_type: Option<String>,
}

/// One step of the user's trail before an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Breadcrumb {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub message: String,
    pub error_type: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub lineno: Option<i32>,
    #[serde(default)]
    pub colno: Option<i32>,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub breadcrumbs: Option<Vec<Breadcrumb>>,
    #[serde(default)]
    pub component_stack: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageViewData {
    pub page_path: String,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub previous_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedData {
    pub load_time: f64,
    pub dom_content_loaded: f64,
    pub dom_interactive: f64,
    pub resource_load_time: f64,
    #[serde(default)]
    pub first_paint: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementData {
    pub time_on_page: f64,
    /// Percent; fractional values are rounded
    pub scroll_depth: f64,
    pub interaction_count: i64,
    #[serde(default)]
    pub exit_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkErrorData {
    pub url: String,
    pub method: String,
    pub message: String,
    pub duration: f64,
    pub error_type: String,
    #[serde(default)]
    pub status_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePerformanceData {
    pub url: String,
    pub resource_type: String,
    pub duration: f64,
    #[serde(default)]
    pub transfer_size: i64,
    #[serde(default)]
    pub encoded_body_size: i64,
    #[serde(default)]
    pub decoded_body_size: i64,
    #[serde(default)]
    pub cache_hit: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserActionData {
    pub action_type: String,
    pub target_element: String,
    #[serde(default)]
    pub target_text: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub target_class: Option<String>,
    #[serde(default)]
    pub x_path: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// A classified batch item, one variant per event kind
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    WebVital(Envelope<WebVitalData>),
    Error(Envelope<ErrorData>),
    PageView(Envelope<PageViewData>),
    PageSpeed(Envelope<PageSpeedData>),
    Engagement(Envelope<EngagementData>),
    NetworkError(Envelope<NetworkErrorData>),
    ResourcePerformance(Envelope<ResourcePerformanceData>),
    UserAction(Envelope<UserActionData>),
}

impl TelemetryEvent {
    /// Decode one untyped batch item by its `type` discriminator.
    pub fn classify(item: Value) -> Result<Self, IngestFailure> {
        let event_type = match item.get("type") {
            None | Some(Value::Null) => return Err(IngestFailure::MissingEventType),
            Some(Value::String(tag)) => EventType::from_tag(tag),
            Some(other) => EventType::Unrecognized(other.to_string()),
        };

        match event_type {
            EventType::WebVital => decode(item, "webVital").map(TelemetryEvent::WebVital),
            EventType::Error => decode(item, "error").map(TelemetryEvent::Error),
            EventType::PageView => decode(item, "pageView").map(TelemetryEvent::PageView),
            EventType::PageSpeed => decode(item, "pageSpeed").map(TelemetryEvent::PageSpeed),
            EventType::Engagement => decode(item, "engagement").map(TelemetryEvent::Engagement),
            EventType::NetworkError => {
                decode(item, "networkError").map(TelemetryEvent::NetworkError)
            }
            EventType::ResourcePerformance => {
                decode(item, "resourcePerformance").map(TelemetryEvent::ResourcePerformance)
            }
            EventType::UserAction => decode(item, "userAction").map(TelemetryEvent::UserAction),
            EventType::Unrecognized(tag) => Err(IngestFailure::UnknownEventType(tag)),
        }
    }

    /// The wire tag of this event's kind
    pub fn type_tag(&self) -> &'static str {
        match self {
            TelemetryEvent::WebVital(_) => "webVital",
            TelemetryEvent::Error(_) => "error",
            TelemetryEvent::PageView(_) => "pageView",
            TelemetryEvent::PageSpeed(_) => "pageSpeed",
            TelemetryEvent::Engagement(_) => "engagement",
            TelemetryEvent::NetworkError(_) => "networkError",
            TelemetryEvent::ResourcePerformance(_) => "resourcePerformance",
            TelemetryEvent::UserAction(_) => "userAction",
        }
    }
}

fn decode<T: DeserializeOwned>(
    item: Value,
    event_type: &'static str,
) -> Result<Envelope<T>, IngestFailure> {
    let envelope: Envelope<T> =
        serde_json::from_value(item).map_err(|e| IngestFailure::MalformedItem {
            event_type,
            reason: e.to_string(),
        })?;

    if envelope.session_id.trim().is_empty() {
        return Err(IngestFailure::MalformedItem {
            event_type,
            reason: "sessionId must not be blank".to_string(),
        });
    }

    Ok(envelope)
}
