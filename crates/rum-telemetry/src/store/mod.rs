//! Persistence capability per event kind
//!
//! Every kind gets the uniform [`EventStore`] operations; kinds with extra read
//! queries add them through an extension trait. [`TelemetryStores`] bundles one
//! store per kind behind trait objects so ingestion and analytics never depend on
//! the concrete backend.

mod sea_orm_store;
#[cfg(test)]
pub(crate) mod unavailable;

use std::sync::Arc;

use async_trait::async_trait;
use rum_core::TimeRange;
use rum_entities::{
    engagement_events, error_events, network_error_events, page_speed_events, page_view_events,
    resource_performance_events, user_action_events, web_vital_events,
};
use sea_orm::{ActiveModelBehavior, ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait};
use thiserror::Error;

use crate::types::{PageSpeedStats, TopPage};

pub use sea_orm_store::SeaOrmEventStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// An append-only telemetry table
pub trait EventEntity: EntityTrait + 'static {
    type Active: ActiveModelTrait<Entity = Self> + ActiveModelBehavior + Send + Sync + 'static;

    /// Wire tag of the kind stored in this table
    const TYPE_TAG: &'static str;

    /// Time-range reads return the newest record first
    const NEWEST_FIRST: bool = false;

    fn session_column() -> Self::Column;

    fn timestamp_column() -> Self::Column;
}

macro_rules! event_entity {
    ($module:ident, $tag:literal) => {
        event_entity!($module, $tag, false);
    };
    ($module:ident, $tag:literal, $newest_first:literal) => {
        impl EventEntity for $module::Entity {
            type Active = $module::ActiveModel;
            const TYPE_TAG: &'static str = $tag;
            const NEWEST_FIRST: bool = $newest_first;

            fn session_column() -> Self::Column {
                $module::Column::SessionId
            }

            fn timestamp_column() -> Self::Column {
                $module::Column::EventTimestamp
            }
        }
    };
}

event_entity!(web_vital_events, "webVital");
event_entity!(error_events, "error");
event_entity!(page_view_events, "pageView", true);
event_entity!(page_speed_events, "pageSpeed", true);
event_entity!(engagement_events, "engagement");
event_entity!(network_error_events, "networkError");
event_entity!(resource_performance_events, "resourcePerformance");
event_entity!(user_action_events, "userAction");

/// Operations every kind supports. Records are never updated or deleted.
#[async_trait]
pub trait EventStore<E: EventEntity>: Send + Sync {
    /// Append one record and return it as stored
    async fn save(&self, record: E::Active) -> Result<E::Model, StoreError>;

    /// All records of one session, oldest first
    async fn find_by_session(&self, session_id: &str) -> Result<Vec<E::Model>, StoreError>;

    /// Records whose event timestamp lies inside the inclusive range
    async fn find_by_time_range(&self, range: TimeRange) -> Result<Vec<E::Model>, StoreError>;

    async fn count_in_range(&self, range: TimeRange) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait WebVitalStore: EventStore<web_vital_events::Entity> {
    async fn find_by_metric_name(
        &self,
        metric_name: &str,
    ) -> Result<Vec<web_vital_events::Model>, StoreError>;

    async fn find_by_metric_and_time_range(
        &self,
        metric_name: &str,
        range: TimeRange,
    ) -> Result<Vec<web_vital_events::Model>, StoreError>;

    /// Distinct session ids among web vitals in range
    async fn count_distinct_sessions(&self, range: TimeRange) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ErrorStore: EventStore<error_events::Entity> {
    async fn find_by_error_type(
        &self,
        error_type: &str,
    ) -> Result<Vec<error_events::Model>, StoreError>;
}

#[async_trait]
pub trait PageViewStore: EventStore<page_view_events::Entity> {
    /// Distinct non-null user ids among page views in range
    async fn count_unique_users(&self, range: TimeRange) -> Result<u64, StoreError>;

    /// Page paths by view count, most viewed first
    async fn top_pages(&self, range: TimeRange) -> Result<Vec<TopPage>, StoreError>;
}

#[async_trait]
pub trait PageSpeedStore: EventStore<page_speed_events::Entity> {
    /// Load-time aggregates grouped by page URL, highest view count first.
    /// Every returned aggregate is >= 0.
    async fn stats_by_page(&self, range: TimeRange) -> Result<Vec<PageSpeedStats>, StoreError>;

    /// Mean load time in range; `None` when there are no rows
    async fn average_load_time(&self, range: TimeRange) -> Result<Option<f64>, StoreError>;
}

#[async_trait]
pub trait EngagementStore: EventStore<engagement_events::Entity> {
    async fn average_time_on_page(&self, range: TimeRange) -> Result<Option<f64>, StoreError>;

    async fn average_scroll_depth(&self, range: TimeRange) -> Result<Option<f64>, StoreError>;
}

#[async_trait]
pub trait NetworkErrorStore: EventStore<network_error_events::Entity> {
    async fn count_by_error_type(
        &self,
        error_type: &str,
        range: TimeRange,
    ) -> Result<u64, StoreError>;
}

/// One store per event kind
#[derive(Clone)]
pub struct TelemetryStores {
    pub web_vitals: Arc<dyn WebVitalStore>,
    pub errors: Arc<dyn ErrorStore>,
    pub page_views: Arc<dyn PageViewStore>,
    pub page_speed: Arc<dyn PageSpeedStore>,
    pub engagement: Arc<dyn EngagementStore>,
    pub network_errors: Arc<dyn NetworkErrorStore>,
    pub resource_performance: Arc<dyn EventStore<resource_performance_events::Entity>>,
    pub user_actions: Arc<dyn EventStore<user_action_events::Entity>>,
}

impl TelemetryStores {
    /// Back every kind with its table on `db`
    pub fn sea_orm(db: Arc<DatabaseConnection>) -> Self {
        Self {
            web_vitals: Arc::new(SeaOrmEventStore::<web_vital_events::Entity>::new(db.clone())),
            errors: Arc::new(SeaOrmEventStore::<error_events::Entity>::new(db.clone())),
            page_views: Arc::new(SeaOrmEventStore::<page_view_events::Entity>::new(db.clone())),
            page_speed: Arc::new(SeaOrmEventStore::<page_speed_events::Entity>::new(db.clone())),
            engagement: Arc::new(SeaOrmEventStore::<engagement_events::Entity>::new(db.clone())),
            network_errors: Arc::new(SeaOrmEventStore::<network_error_events::Entity>::new(
                db.clone(),
            )),
            resource_performance: Arc::new(
                SeaOrmEventStore::<resource_performance_events::Entity>::new(db.clone()),
            ),
            user_actions: Arc::new(SeaOrmEventStore::<user_action_events::Entity>::new(db)),
        }
    }
}
