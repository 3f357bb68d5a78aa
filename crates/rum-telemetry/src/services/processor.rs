//! Per-kind normalisation and persistence of classified events

use rum_core::{from_epoch_millis, UtcDateTime};
use rum_entities::{
    engagement_events, error_events, network_error_events, page_speed_events, page_view_events,
    resource_performance_events, user_action_events, web_vital_events,
};
use sea_orm::Set;
use tracing::debug;

use crate::error::IngestFailure;
use crate::store::{EventStore, StoreError, TelemetryStores};
use crate::types::{
    non_negative, EngagementData, Envelope, ErrorData, NetworkErrorData, PageSpeedData,
    PageViewData, ResourcePerformanceData, TelemetryEvent, UserActionData, WebVitalData,
};

/// Turns a [`TelemetryEvent`] into exactly one stored record of its own kind
#[derive(Clone)]
pub struct EventProcessor {
    stores: TelemetryStores,
}

impl EventProcessor {
    pub fn new(stores: TelemetryStores) -> Self {
        Self { stores }
    }

    pub async fn process(&self, event: TelemetryEvent) -> Result<(), IngestFailure> {
        let event_type = event.type_tag();
        let persistence = |source: StoreError| IngestFailure::Persistence { event_type, source };

        match event {
            TelemetryEvent::WebVital(envelope) => {
                let record = web_vital_record(envelope)?;
                self.stores.web_vitals.save(record).await.map_err(persistence)?;
            }
            TelemetryEvent::Error(envelope) => {
                let record = error_record(envelope)?;
                self.stores.errors.save(record).await.map_err(persistence)?;
            }
            TelemetryEvent::PageView(envelope) => {
                let record = page_view_record(envelope)?;
                self.stores.page_views.save(record).await.map_err(persistence)?;
            }
            TelemetryEvent::PageSpeed(envelope) => {
                let record = page_speed_record(envelope)?;
                self.stores.page_speed.save(record).await.map_err(persistence)?;
            }
            TelemetryEvent::Engagement(envelope) => {
                let record = engagement_record(envelope)?;
                self.stores.engagement.save(record).await.map_err(persistence)?;
            }
            TelemetryEvent::NetworkError(envelope) => {
                let record = network_error_record(envelope)?;
                self.stores
                    .network_errors
                    .save(record)
                    .await
                    .map_err(persistence)?;
            }
            TelemetryEvent::ResourcePerformance(envelope) => {
                let record = resource_performance_record(envelope)?;
                self.stores
                    .resource_performance
                    .save(record)
                    .await
                    .map_err(persistence)?;
            }
            TelemetryEvent::UserAction(envelope) => {
                let record = user_action_record(envelope)?;
                self.stores.user_actions.save(record).await.map_err(persistence)?;
            }
        }

        debug!(event_type, "Persisted telemetry event");
        Ok(())
    }
}

fn event_time<T>(envelope: &Envelope<T>) -> Result<UtcDateTime, IngestFailure> {
    Ok(from_epoch_millis(envelope.timestamp)?)
}

/// Durations are client measurements; anything below zero is an artifact.
fn duration(ms: f64) -> f64 {
    non_negative(Some(ms))
}

fn web_vital_record(
    envelope: Envelope<WebVitalData>,
) -> Result<web_vital_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    Ok(web_vital_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        metric_name: Set(data.name.as_str().to_string()),
        value: Set(data.value),
        rating: Set(data.rating),
        navigation_type: Set(data.navigation_type),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn error_record(envelope: Envelope<ErrorData>) -> Result<error_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    let breadcrumbs = data
        .breadcrumbs
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| IngestFailure::MalformedItem {
            event_type: "error",
            reason: format!("breadcrumbs: {}", e),
        })?;

    Ok(error_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        message: Set(data.message),
        error_type: Set(data.error_type),
        source: Set(data.source),
        lineno: Set(data.lineno),
        colno: Set(data.colno),
        stack: Set(data.stack),
        severity: Set(data.severity),
        breadcrumbs: Set(breadcrumbs),
        component_stack: Set(data.component_stack),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn page_view_record(
    envelope: Envelope<PageViewData>,
) -> Result<page_view_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    Ok(page_view_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        page_path: Set(data.page_path),
        page_title: Set(data.page_title),
        referrer: Set(data.referrer),
        previous_page: Set(data.previous_page),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn page_speed_record(
    envelope: Envelope<PageSpeedData>,
) -> Result<page_speed_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    Ok(page_speed_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        load_time: Set(duration(data.load_time)),
        dom_content_loaded: Set(duration(data.dom_content_loaded)),
        dom_interactive: Set(duration(data.dom_interactive)),
        resource_load_time: Set(duration(data.resource_load_time)),
        first_paint: Set(data.first_paint.map(duration)),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn engagement_record(
    envelope: Envelope<EngagementData>,
) -> Result<engagement_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    let scroll_depth = if data.scroll_depth.is_nan() {
        0
    } else {
        data.scroll_depth.round().clamp(0.0, 100.0) as i32
    };
    let interaction_count = data.interaction_count.clamp(0, i32::MAX as i64) as i32;

    Ok(engagement_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        time_on_page: Set(duration(data.time_on_page)),
        scroll_depth: Set(scroll_depth),
        interaction_count: Set(interaction_count),
        exit_type: Set(data.exit_type),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn network_error_record(
    envelope: Envelope<NetworkErrorData>,
) -> Result<network_error_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    Ok(network_error_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        url: Set(data.url),
        method: Set(data.method),
        status_code: Set(data.status_code),
        message: Set(data.message),
        duration: Set(duration(data.duration)),
        error_type: Set(data.error_type),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn resource_performance_record(
    envelope: Envelope<ResourcePerformanceData>,
) -> Result<resource_performance_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    let transfer_size = data.transfer_size.max(0);
    let decoded_body_size = data.decoded_body_size.max(0);
    // Nothing crossed the wire but a body was decoded: served from cache
    let cache_hit = data
        .cache_hit
        .unwrap_or(transfer_size == 0 && decoded_body_size > 0);

    Ok(resource_performance_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        url: Set(data.url),
        resource_type: Set(data.resource_type),
        duration: Set(duration(data.duration)),
        transfer_size: Set(transfer_size),
        encoded_body_size: Set(data.encoded_body_size.max(0)),
        decoded_body_size: Set(decoded_body_size),
        cache_hit: Set(cache_hit),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}

fn user_action_record(
    envelope: Envelope<UserActionData>,
) -> Result<user_action_events::ActiveModel, IngestFailure> {
    let event_timestamp = event_time(&envelope)?;
    let data = envelope.data;

    Ok(user_action_events::ActiveModel {
        session_id: Set(envelope.session_id),
        user_id: Set(envelope.user_id),
        page_url: Set(envelope.page_url),
        user_agent: Set(envelope.user_agent),
        action_type: Set(data.action_type),
        target_element: Set(data.target_element),
        target_text: Set(data.target_text),
        target_id: Set(data.target_id),
        target_class: Set(data.target_class),
        x_path: Set(data.x_path),
        value: Set(data.value),
        event_timestamp: Set(event_timestamp),
        ..Default::default()
    })
}
