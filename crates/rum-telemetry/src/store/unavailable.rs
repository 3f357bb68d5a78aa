//! A store whose every operation fails, for exercising persistence-failure paths

use async_trait::async_trait;
use rum_core::TimeRange;
use rum_entities::{error_events, web_vital_events};

use super::{
    EngagementStore, ErrorStore, EventEntity, EventStore, NetworkErrorStore, PageSpeedStore,
    PageViewStore, StoreError, WebVitalStore,
};
use crate::types::{PageSpeedStats, TopPage};

pub(crate) struct UnavailableStore;

fn down<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl<E: EventEntity> EventStore<E> for UnavailableStore {
    async fn save(&self, _record: E::Active) -> Result<E::Model, StoreError> {
        down()
    }

    async fn find_by_session(&self, _session_id: &str) -> Result<Vec<E::Model>, StoreError> {
        down()
    }

    async fn find_by_time_range(&self, _range: TimeRange) -> Result<Vec<E::Model>, StoreError> {
        down()
    }

    async fn count_in_range(&self, _range: TimeRange) -> Result<u64, StoreError> {
        down()
    }
}

#[async_trait]
impl WebVitalStore for UnavailableStore {
    async fn find_by_metric_name(
        &self,
        _metric_name: &str,
    ) -> Result<Vec<web_vital_events::Model>, StoreError> {
        down()
    }

    async fn find_by_metric_and_time_range(
        &self,
        _metric_name: &str,
        _range: TimeRange,
    ) -> Result<Vec<web_vital_events::Model>, StoreError> {
        down()
    }

    async fn count_distinct_sessions(&self, _range: TimeRange) -> Result<u64, StoreError> {
        down()
    }
}

#[async_trait]
impl ErrorStore for UnavailableStore {
    async fn find_by_error_type(
        &self,
        _error_type: &str,
    ) -> Result<Vec<error_events::Model>, StoreError> {
        down()
    }
}

#[async_trait]
impl PageViewStore for UnavailableStore {
    async fn count_unique_users(&self, _range: TimeRange) -> Result<u64, StoreError> {
        down()
    }

    async fn top_pages(&self, _range: TimeRange) -> Result<Vec<TopPage>, StoreError> {
        down()
    }
}

#[async_trait]
impl PageSpeedStore for UnavailableStore {
    async fn stats_by_page(&self, _range: TimeRange) -> Result<Vec<PageSpeedStats>, StoreError> {
        down()
    }

    async fn average_load_time(&self, _range: TimeRange) -> Result<Option<f64>, StoreError> {
        down()
    }
}

#[async_trait]
impl EngagementStore for UnavailableStore {
    async fn average_time_on_page(&self, _range: TimeRange) -> Result<Option<f64>, StoreError> {
        down()
    }

    async fn average_scroll_depth(&self, _range: TimeRange) -> Result<Option<f64>, StoreError> {
        down()
    }
}

#[async_trait]
impl NetworkErrorStore for UnavailableStore {
    async fn count_by_error_type(
        &self,
        _error_type: &str,
        _range: TimeRange,
    ) -> Result<u64, StoreError> {
        down()
    }
}

