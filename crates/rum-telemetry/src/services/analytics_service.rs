use rum_core::TimeRange;
use tracing::debug;

use crate::error::TelemetryError;
use crate::store::{
    EngagementStore, EventStore, NetworkErrorStore, PageSpeedStore, PageViewStore,
    TelemetryStores, WebVitalStore,
};
use crate::types::{non_negative, DashboardStats, EngagementStats, PageSpeedStats, TopPage};

/// Time-windowed aggregates for the operations dashboard
pub struct AnalyticsService {
    stores: TelemetryStores,
}

impl AnalyticsService {
    pub fn new(stores: TelemetryStores) -> Self {
        Self { stores }
    }

    /// Assemble the dashboard snapshot for `range`.
    ///
    /// Each figure is its own query with no shared snapshot, so concurrent writes
    /// may show up in some figures and not in others.
    pub async fn dashboard_stats(&self, range: TimeRange) -> Result<DashboardStats, TelemetryError> {
        let unique_sessions = self.stores.web_vitals.count_distinct_sessions(range).await?;
        let unique_users = self.stores.page_views.count_unique_users(range).await?;
        let total_page_views = self.stores.page_views.count_in_range(range).await?;
        let total_errors = self.stores.errors.count_in_range(range).await?;
        let avg_page_load_time =
            non_negative(self.stores.page_speed.average_load_time(range).await?);

        debug!(
            unique_sessions,
            unique_users, total_page_views, total_errors, "Computed dashboard stats"
        );

        Ok(DashboardStats {
            unique_sessions,
            unique_users,
            total_page_views,
            total_errors,
            avg_page_load_time,
        })
    }

    pub async fn page_speed_stats(
        &self,
        range: TimeRange,
    ) -> Result<Vec<PageSpeedStats>, TelemetryError> {
        Ok(self.stores.page_speed.stats_by_page(range).await?)
    }

    pub async fn top_pages(&self, range: TimeRange) -> Result<Vec<TopPage>, TelemetryError> {
        Ok(self.stores.page_views.top_pages(range).await?)
    }

    pub async fn engagement_stats(
        &self,
        range: TimeRange,
    ) -> Result<EngagementStats, TelemetryError> {
        let avg_time_on_page = self.stores.engagement.average_time_on_page(range).await?;
        let avg_scroll_depth = self.stores.engagement.average_scroll_depth(range).await?;

        Ok(EngagementStats {
            avg_time_on_page: non_negative(avg_time_on_page),
            avg_scroll_depth: non_negative(avg_scroll_depth),
        })
    }

    pub async fn network_error_count(
        &self,
        error_type: &str,
        range: TimeRange,
    ) -> Result<u64, TelemetryError> {
        Ok(self
            .stores
            .network_errors
            .count_by_error_type(error_type, range)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use rum_database::test_utils::TestDatabase;
    use serde_json::json;

    use crate::services::IngestionService;
    use crate::store::unavailable::UnavailableStore;

    fn range(start: i64, end: i64) -> TimeRange {
        TimeRange::new(
            chrono::Utc.timestamp_millis_opt(start).unwrap(),
            chrono::Utc.timestamp_millis_opt(end).unwrap(),
        )
    }

    async fn setup() -> (TestDatabase, IngestionService, AnalyticsService) {
        let test_db = TestDatabase::with_migrations()
            .await
            .expect("Failed to create test database");
        let stores = TelemetryStores::sea_orm(test_db.connection_arc());
        (
            test_db,
            IngestionService::new(stores.clone()),
            AnalyticsService::new(stores),
        )
    }

    #[tokio::test]
    async fn test_dashboard_stats_empty_window_is_all_zero() {
        let (_db, _ingestion, analytics) = setup().await;

        let stats = analytics.dashboard_stats(range(0, 10_000)).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                unique_sessions: 0,
                unique_users: 0,
                total_page_views: 0,
                total_errors: 0,
                avg_page_load_time: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn test_dashboard_stats_one_page_view_and_one_error() {
        let (_db, ingestion, analytics) = setup().await;

        ingestion
            .ingest(vec![
                json!({
                    "type": "pageView",
                    "timestamp": 2_000,
                    "sessionId": "s1",
                    "userId": "u1",
                    "data": {"pagePath": "/"}
                }),
                json!({
                    "type": "error",
                    "timestamp": 2_500,
                    "sessionId": "s1",
                    "data": {"message": "boom", "errorType": "javascript"}
                }),
            ])
            .await
            .unwrap();

        let stats = analytics.dashboard_stats(range(1_000, 3_000)).await.unwrap();
        assert_eq!(stats.unique_users, 1);
        assert_eq!(stats.total_page_views, 1);
        assert_eq!(stats.total_errors, 1);
        // Sessions are counted from web vitals only
        assert_eq!(stats.unique_sessions, 0);
        assert_eq!(stats.avg_page_load_time, 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_stats_sessions_and_load_time() {
        let (_db, ingestion, analytics) = setup().await;

        let vital = |session: &str| {
            json!({
                "type": "webVital",
                "timestamp": 1_500,
                "sessionId": session,
                "data": {"name": "FCP", "value": 900}
            })
        };
        let speed = |load_time: f64| {
            json!({
                "type": "pageSpeed",
                "timestamp": 1_500,
                "sessionId": "s1",
                "data": {"loadTime": load_time, "domContentLoaded": 1,
                         "domInteractive": 1, "resourceLoadTime": 1}
            })
        };

        ingestion
            .ingest(vec![
                vital("s1"),
                vital("s1"),
                vital("s2"),
                speed(400.0),
                speed(800.0),
            ])
            .await
            .unwrap();

        let stats = analytics.dashboard_stats(range(1_000, 2_000)).await.unwrap();
        assert_eq!(stats.unique_sessions, 2);
        assert_eq!(stats.avg_page_load_time, 600.0);

        let outside = analytics.dashboard_stats(range(5_000, 6_000)).await.unwrap();
        assert_eq!(outside.unique_sessions, 0);
        assert_eq!(outside.avg_page_load_time, 0.0);
    }

    #[tokio::test]
    async fn test_page_speed_stats_for_one_url() {
        let (_db, ingestion, analytics) = setup().await;

        let speed = |load_time: f64| {
            json!({
                "type": "pageSpeed",
                "timestamp": 1_500,
                "sessionId": "s1",
                "pageUrl": "https://shop.example/checkout",
                "data": {"loadTime": load_time, "domContentLoaded": 1,
                         "domInteractive": 1, "resourceLoadTime": 1}
            })
        };

        ingestion
            .ingest(vec![speed(100.0), speed(300.0)])
            .await
            .unwrap();

        let stats = analytics.page_speed_stats(range(0, 10_000)).await.unwrap();
        assert_eq!(
            stats,
            vec![PageSpeedStats {
                page_url: Some("https://shop.example/checkout".to_string()),
                view_count: 2,
                avg_load_time: 200.0,
                min_load_time: 100.0,
                max_load_time: 300.0,
            }]
        );
    }

    #[tokio::test]
    async fn test_engagement_stats_defaults_to_zero() {
        let (_db, ingestion, analytics) = setup().await;

        let empty = analytics.engagement_stats(range(0, 10)).await.unwrap();
        assert_eq!(empty.avg_time_on_page, 0.0);
        assert_eq!(empty.avg_scroll_depth, 0.0);

        ingestion
            .ingest(vec![json!({
                "type": "engagement",
                "timestamp": 5,
                "sessionId": "s1",
                "data": {"timeOnPage": 12000, "scrollDepth": 40, "interactionCount": 2}
            })])
            .await
            .unwrap();

        let stats = analytics.engagement_stats(range(0, 10)).await.unwrap();
        assert_eq!(stats.avg_time_on_page, 12_000.0);
        assert_eq!(stats.avg_scroll_depth, 40.0);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_request_error() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let mut stores = TelemetryStores::sea_orm(test_db.connection_arc());
        stores.errors = Arc::new(UnavailableStore);
        let analytics = AnalyticsService::new(stores);

        let result = analytics.dashboard_stats(range(0, 10)).await;
        assert!(matches!(result, Err(TelemetryError::Store(_))));
    }
}
