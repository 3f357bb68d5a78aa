use rum_core::TimeRange;
use rum_entities::{error_events, page_speed_events, page_view_events, web_vital_events};

use crate::error::TelemetryError;
use crate::store::{ErrorStore, EventStore, TelemetryStores, WebVitalStore};

/// Record-level reads, passed straight through to the stores
pub struct QueryService {
    stores: TelemetryStores,
}

impl QueryService {
    pub fn new(stores: TelemetryStores) -> Self {
        Self { stores }
    }

    pub async fn vitals_by_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<web_vital_events::Model>, TelemetryError> {
        Ok(self.stores.web_vitals.find_by_session(session_id).await?)
    }

    pub async fn errors_by_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<error_events::Model>, TelemetryError> {
        Ok(self.stores.errors.find_by_session(session_id).await?)
    }

    pub async fn vitals_in_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<web_vital_events::Model>, TelemetryError> {
        Ok(self.stores.web_vitals.find_by_time_range(range).await?)
    }

    pub async fn vitals_by_metric_in_range(
        &self,
        metric_name: &str,
        range: TimeRange,
    ) -> Result<Vec<web_vital_events::Model>, TelemetryError> {
        Ok(self
            .stores
            .web_vitals
            .find_by_metric_and_time_range(metric_name, range)
            .await?)
    }

    pub async fn vitals_by_metric(
        &self,
        metric_name: &str,
    ) -> Result<Vec<web_vital_events::Model>, TelemetryError> {
        Ok(self.stores.web_vitals.find_by_metric_name(metric_name).await?)
    }

    pub async fn errors_in_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<error_events::Model>, TelemetryError> {
        Ok(self.stores.errors.find_by_time_range(range).await?)
    }

    pub async fn errors_by_type(
        &self,
        error_type: &str,
    ) -> Result<Vec<error_events::Model>, TelemetryError> {
        Ok(self.stores.errors.find_by_error_type(error_type).await?)
    }

    /// Newest first
    pub async fn page_views_in_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<page_view_events::Model>, TelemetryError> {
        Ok(self.stores.page_views.find_by_time_range(range).await?)
    }

    /// Newest first
    pub async fn page_speed_in_range(
        &self,
        range: TimeRange,
    ) -> Result<Vec<page_speed_events::Model>, TelemetryError> {
        Ok(self.stores.page_speed.find_by_time_range(range).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rum_database::test_utils::TestDatabase;
    use serde_json::json;

    use crate::services::IngestionService;

    fn range(start: i64, end: i64) -> TimeRange {
        TimeRange::new(
            chrono::Utc.timestamp_millis_opt(start).unwrap(),
            chrono::Utc.timestamp_millis_opt(end).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_reads_by_session_metric_and_error_type() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let stores = TelemetryStores::sea_orm(test_db.connection_arc());
        let ingestion = IngestionService::new(stores.clone());
        let queries = QueryService::new(stores);

        ingestion
            .ingest(vec![
                json!({"type": "webVital", "timestamp": 100, "sessionId": "s1",
                       "data": {"name": "INP", "value": 180}}),
                json!({"type": "webVital", "timestamp": 900, "sessionId": "s2",
                       "data": {"name": "INP", "value": 90}}),
                json!({"type": "error", "timestamp": 200, "sessionId": "s1",
                       "data": {"message": "fetch failed", "errorType": "promise"}}),
            ])
            .await
            .unwrap();

        assert_eq!(queries.vitals_by_session("s1").await.unwrap().len(), 1);
        assert_eq!(queries.errors_by_session("s1").await.unwrap().len(), 1);
        assert!(queries.errors_by_session("s2").await.unwrap().is_empty());
        assert_eq!(queries.vitals_by_metric("INP").await.unwrap().len(), 2);
        assert_eq!(
            queries
                .vitals_by_metric_in_range("INP", range(0, 500))
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(queries.errors_by_type("promise").await.unwrap().len(), 1);
        assert_eq!(queries.errors_in_range(range(0, 150)).await.unwrap().len(), 0);
        assert_eq!(queries.vitals_in_range(range(100, 900)).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_views_in_range_newest_first() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let stores = TelemetryStores::sea_orm(test_db.connection_arc());
        let ingestion = IngestionService::new(stores.clone());
        let queries = QueryService::new(stores);

        let view = |timestamp: i64, path: &str| {
            json!({"type": "pageView", "timestamp": timestamp, "sessionId": "s1",
                   "data": {"pagePath": path}})
        };
        ingestion
            .ingest(vec![view(10, "/a"), view(30, "/c"), view(20, "/b")])
            .await
            .unwrap();

        let paths: Vec<_> = queries
            .page_views_in_range(range(0, 100))
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.page_path)
            .collect();
        assert_eq!(paths, vec!["/c", "/b", "/a"]);
    }
}
