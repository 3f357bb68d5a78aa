//! sea-orm entities for the browser telemetry tables
//!
//! Every table shares the envelope columns (`session_id`, `user_id`, `page_url`,
//! `user_agent`, `event_timestamp`, `created_at`); rows are append-only.

pub mod engagement_events;
pub mod error_events;
pub mod network_error_events;
pub mod page_speed_events;
pub mod page_view_events;
pub mod resource_performance_events;
pub mod user_action_events;
pub mod web_vital_events;
