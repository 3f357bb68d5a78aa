use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use rum_core::TimeRange;
use rum_entities::{
    engagement_events, error_events, network_error_events, page_speed_events, page_view_events,
    web_vital_events,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, Statement,
};

use super::{
    EngagementStore, ErrorStore, EventEntity, EventStore, NetworkErrorStore, PageSpeedStore,
    PageViewStore, StoreError, WebVitalStore,
};
use crate::types::{non_negative, PageSpeedStats, TopPage};

/// [`EventStore`] over one sea-orm entity table
pub struct SeaOrmEventStore<E> {
    db: Arc<DatabaseConnection>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> SeaOrmEventStore<E> {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    /// Run a `SELECT COUNT(..) AS count` statement bound to the range
    async fn count_statement(&self, sql: &str, range: TimeRange) -> Result<u64, StoreError> {
        #[derive(FromQueryResult)]
        struct CountRow {
            count: i64,
        }

        let row = CountRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            vec![range.start.into(), range.end.into()],
        ))
        .one(self.db.as_ref())
        .await?;

        Ok(row.map(|r| r.count.max(0) as u64).unwrap_or(0))
    }

    /// Run a `SELECT AVG(..) AS average` statement bound to the range
    async fn average_statement(
        &self,
        sql: &str,
        range: TimeRange,
    ) -> Result<Option<f64>, StoreError> {
        #[derive(FromQueryResult)]
        struct AverageRow {
            average: Option<f64>,
        }

        let row = AverageRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            sql,
            vec![range.start.into(), range.end.into()],
        ))
        .one(self.db.as_ref())
        .await?;

        Ok(row.and_then(|r| r.average))
    }
}

#[async_trait]
impl<E> EventStore<E> for SeaOrmEventStore<E>
where
    E: EventEntity,
    E::Model: IntoActiveModel<E::Active> + Sync,
{
    async fn save(&self, record: E::Active) -> Result<E::Model, StoreError> {
        Ok(record.insert(self.db.as_ref()).await?)
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Vec<E::Model>, StoreError> {
        Ok(E::find()
            .filter(E::session_column().eq(session_id))
            .order_by_asc(E::timestamp_column())
            .all(self.db.as_ref())
            .await?)
    }

    async fn find_by_time_range(&self, range: TimeRange) -> Result<Vec<E::Model>, StoreError> {
        let order = if E::NEWEST_FIRST {
            Order::Desc
        } else {
            Order::Asc
        };

        Ok(E::find()
            .filter(E::timestamp_column().between(range.start, range.end))
            .order_by(E::timestamp_column(), order)
            .all(self.db.as_ref())
            .await?)
    }

    async fn count_in_range(&self, range: TimeRange) -> Result<u64, StoreError> {
        Ok(E::find()
            .filter(E::timestamp_column().between(range.start, range.end))
            .count(self.db.as_ref())
            .await?)
    }
}

#[async_trait]
impl WebVitalStore for SeaOrmEventStore<web_vital_events::Entity> {
    async fn find_by_metric_name(
        &self,
        metric_name: &str,
    ) -> Result<Vec<web_vital_events::Model>, StoreError> {
        Ok(web_vital_events::Entity::find()
            .filter(web_vital_events::Column::MetricName.eq(metric_name))
            .order_by_asc(web_vital_events::Column::EventTimestamp)
            .all(self.db.as_ref())
            .await?)
    }

    async fn find_by_metric_and_time_range(
        &self,
        metric_name: &str,
        range: TimeRange,
    ) -> Result<Vec<web_vital_events::Model>, StoreError> {
        Ok(web_vital_events::Entity::find()
            .filter(web_vital_events::Column::MetricName.eq(metric_name))
            .filter(web_vital_events::Column::EventTimestamp.between(range.start, range.end))
            .order_by_asc(web_vital_events::Column::EventTimestamp)
            .all(self.db.as_ref())
            .await?)
    }

    async fn count_distinct_sessions(&self, range: TimeRange) -> Result<u64, StoreError> {
        self.count_statement(
            r#"
            SELECT COUNT(DISTINCT session_id) AS count
            FROM web_vital_events
            WHERE event_timestamp BETWEEN $1 AND $2
            "#,
            range,
        )
        .await
    }
}

#[async_trait]
impl ErrorStore for SeaOrmEventStore<error_events::Entity> {
    async fn find_by_error_type(
        &self,
        error_type: &str,
    ) -> Result<Vec<error_events::Model>, StoreError> {
        Ok(error_events::Entity::find()
            .filter(error_events::Column::ErrorType.eq(error_type))
            .order_by_asc(error_events::Column::EventTimestamp)
            .all(self.db.as_ref())
            .await?)
    }
}

#[async_trait]
impl PageViewStore for SeaOrmEventStore<page_view_events::Entity> {
    async fn count_unique_users(&self, range: TimeRange) -> Result<u64, StoreError> {
        self.count_statement(
            r#"
            SELECT COUNT(DISTINCT user_id) AS count
            FROM page_view_events
            WHERE event_timestamp BETWEEN $1 AND $2
            "#,
            range,
        )
        .await
    }

    async fn top_pages(&self, range: TimeRange) -> Result<Vec<TopPage>, StoreError> {
        #[derive(FromQueryResult)]
        struct TopPageRow {
            page_path: String,
            view_count: i64,
        }

        let rows = TopPageRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT page_path, COUNT(*) AS view_count
            FROM page_view_events
            WHERE event_timestamp BETWEEN $1 AND $2
            GROUP BY page_path
            ORDER BY view_count DESC, page_path ASC
            "#,
            vec![range.start.into(), range.end.into()],
        ))
        .all(self.db.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopPage {
                page_path: row.page_path,
                view_count: row.view_count.max(0) as u64,
            })
            .collect())
    }
}

#[async_trait]
impl PageSpeedStore for SeaOrmEventStore<page_speed_events::Entity> {
    async fn stats_by_page(&self, range: TimeRange) -> Result<Vec<PageSpeedStats>, StoreError> {
        #[derive(FromQueryResult)]
        struct PageStatsRow {
            page_url: Option<String>,
            view_count: i64,
            avg_load_time: Option<f64>,
            min_load_time: Option<f64>,
            max_load_time: Option<f64>,
        }

        let rows = PageStatsRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT
                page_url,
                COUNT(*) AS view_count,
                AVG(load_time) AS avg_load_time,
                MIN(load_time) AS min_load_time,
                MAX(load_time) AS max_load_time
            FROM page_speed_events
            WHERE event_timestamp BETWEEN $1 AND $2
            GROUP BY page_url
            ORDER BY view_count DESC, page_url ASC
            "#,
            vec![range.start.into(), range.end.into()],
        ))
        .all(self.db.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PageSpeedStats {
                page_url: row.page_url,
                view_count: row.view_count.max(0) as u64,
                avg_load_time: non_negative(row.avg_load_time),
                min_load_time: non_negative(row.min_load_time),
                max_load_time: non_negative(row.max_load_time),
            })
            .collect())
    }

    async fn average_load_time(&self, range: TimeRange) -> Result<Option<f64>, StoreError> {
        self.average_statement(
            r#"
            SELECT AVG(load_time) AS average
            FROM page_speed_events
            WHERE event_timestamp BETWEEN $1 AND $2
            "#,
            range,
        )
        .await
    }
}

#[async_trait]
impl EngagementStore for SeaOrmEventStore<engagement_events::Entity> {
    async fn average_time_on_page(&self, range: TimeRange) -> Result<Option<f64>, StoreError> {
        self.average_statement(
            r#"
            SELECT AVG(time_on_page) AS average
            FROM engagement_events
            WHERE event_timestamp BETWEEN $1 AND $2
            "#,
            range,
        )
        .await
    }

    async fn average_scroll_depth(&self, range: TimeRange) -> Result<Option<f64>, StoreError> {
        // AVG over an integer column is NUMERIC on PostgreSQL
        self.average_statement(
            r#"
            SELECT AVG(CAST(scroll_depth AS DOUBLE PRECISION)) AS average
            FROM engagement_events
            WHERE event_timestamp BETWEEN $1 AND $2
            "#,
            range,
        )
        .await
    }
}

#[async_trait]
impl NetworkErrorStore for SeaOrmEventStore<network_error_events::Entity> {
    async fn count_by_error_type(
        &self,
        error_type: &str,
        range: TimeRange,
    ) -> Result<u64, StoreError> {
        Ok(network_error_events::Entity::find()
            .filter(network_error_events::Column::ErrorType.eq(error_type))
            .filter(network_error_events::Column::EventTimestamp.between(range.start, range.end))
            .count(self.db.as_ref())
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rum_core::UtcDateTime;
    use rum_database::test_utils::TestDatabase;
    use sea_orm::Set;

    fn at(millis: i64) -> UtcDateTime {
        chrono::Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn range(start: i64, end: i64) -> TimeRange {
        TimeRange::new(at(start), at(end))
    }

    fn page_speed(page_url: &str, load_time: f64, millis: i64) -> page_speed_events::ActiveModel {
        page_speed_events::ActiveModel {
            session_id: Set("s1".to_string()),
            page_url: Set(Some(page_url.to_string())),
            load_time: Set(load_time),
            dom_content_loaded: Set(0.0),
            dom_interactive: Set(0.0),
            resource_load_time: Set(0.0),
            first_paint: Set(None),
            event_timestamp: Set(at(millis)),
            ..Default::default()
        }
    }

    fn page_view(path: &str, user: Option<&str>, millis: i64) -> page_view_events::ActiveModel {
        page_view_events::ActiveModel {
            session_id: Set("s1".to_string()),
            user_id: Set(user.map(str::to_string)),
            page_path: Set(path.to_string()),
            event_timestamp: Set(at(millis)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_save_sets_created_at_and_id() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_speed_events::Entity>::new(test_db.connection_arc());

        let saved = store.save(page_speed("/a", 120.0, 1_000)).await.unwrap();
        assert!(saved.id > 0);
        assert_eq!(saved.event_timestamp, at(1_000));
        assert!(saved.created_at > at(1_000));
    }

    #[tokio::test]
    async fn test_time_range_is_inclusive_and_newest_first_for_page_speed() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_speed_events::Entity>::new(test_db.connection_arc());

        for millis in [999, 1_000, 1_500, 2_000, 2_001] {
            store.save(page_speed("/a", 1.0, millis)).await.unwrap();
        }

        let found = store.find_by_time_range(range(1_000, 2_000)).await.unwrap();
        let stamps: Vec<_> = found.iter().map(|m| m.event_timestamp).collect();
        assert_eq!(stamps, vec![at(2_000), at(1_500), at(1_000)]);
        assert_eq!(store.count_in_range(range(1_000, 2_000)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_reversed_range_matches_nothing() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_speed_events::Entity>::new(test_db.connection_arc());
        store.save(page_speed("/a", 1.0, 1_500)).await.unwrap();

        assert!(store
            .find_by_time_range(range(2_000, 1_000))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.count_in_range(range(2_000, 1_000)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_by_page_orders_by_view_count_and_clamps() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_speed_events::Entity>::new(test_db.connection_arc());

        store.save(page_speed("/home", 100.0, 1_000)).await.unwrap();
        store.save(page_speed("/home", 300.0, 1_100)).await.unwrap();
        store.save(page_speed("/home", 200.0, 1_200)).await.unwrap();
        store.save(page_speed("/about", 50.0, 1_300)).await.unwrap();
        store.save(page_speed("/about", 70.0, 1_400)).await.unwrap();
        // Corrupted rows written around the processor
        store.save(page_speed("/broken", -40.0, 1_500)).await.unwrap();

        let stats = store.stats_by_page(range(0, 10_000)).await.unwrap();
        assert_eq!(stats.len(), 3);

        assert_eq!(stats[0].page_url.as_deref(), Some("/home"));
        assert_eq!(stats[0].view_count, 3);
        assert_eq!(stats[0].avg_load_time, 200.0);
        assert_eq!(stats[0].min_load_time, 100.0);
        assert_eq!(stats[0].max_load_time, 300.0);

        assert_eq!(stats[1].page_url.as_deref(), Some("/about"));
        assert_eq!(stats[1].view_count, 2);

        assert_eq!(stats[2].page_url.as_deref(), Some("/broken"));
        assert_eq!(stats[2].avg_load_time, 0.0);
        assert_eq!(stats[2].min_load_time, 0.0);
        assert_eq!(stats[2].max_load_time, 0.0);

        for window in stats.windows(2) {
            assert!(window[0].view_count >= window[1].view_count);
        }
    }

    #[tokio::test]
    async fn test_average_load_time_empty_range_is_none() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_speed_events::Entity>::new(test_db.connection_arc());

        assert_eq!(store.average_load_time(range(0, 10)).await.unwrap(), None);

        store.save(page_speed("/a", 100.0, 5)).await.unwrap();
        store.save(page_speed("/a", 200.0, 6)).await.unwrap();
        assert_eq!(
            store.average_load_time(range(0, 10)).await.unwrap(),
            Some(150.0)
        );
    }

    #[tokio::test]
    async fn test_page_view_unique_users_and_top_pages() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<page_view_events::Entity>::new(test_db.connection_arc());

        store.save(page_view("/", Some("u1"), 1)).await.unwrap();
        store.save(page_view("/", Some("u1"), 2)).await.unwrap();
        store.save(page_view("/cart", Some("u2"), 3)).await.unwrap();
        store.save(page_view("/", None, 4)).await.unwrap();

        assert_eq!(store.count_unique_users(range(0, 10)).await.unwrap(), 2);

        let top = store.top_pages(range(0, 10)).await.unwrap();
        assert_eq!(
            top,
            vec![
                TopPage {
                    page_path: "/".to_string(),
                    view_count: 3
                },
                TopPage {
                    page_path: "/cart".to_string(),
                    view_count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_web_vital_queries() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<web_vital_events::Entity>::new(test_db.connection_arc());

        for (session, metric, millis) in [
            ("s1", "LCP", 10),
            ("s1", "CLS", 20),
            ("s2", "LCP", 30),
            ("s3", "LCP", 500),
        ] {
            store
                .save(web_vital_events::ActiveModel {
                    session_id: Set(session.to_string()),
                    metric_name: Set(metric.to_string()),
                    value: Set(1.0),
                    event_timestamp: Set(at(millis)),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        assert_eq!(store.find_by_metric_name("LCP").await.unwrap().len(), 3);
        assert_eq!(
            store
                .find_by_metric_and_time_range("LCP", range(0, 100))
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(store.count_distinct_sessions(range(0, 100)).await.unwrap(), 2);
        assert_eq!(store.find_by_session("s1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_engagement_averages() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store = SeaOrmEventStore::<engagement_events::Entity>::new(test_db.connection_arc());

        for (time_on_page, scroll_depth) in [(1_000.0, 50), (3_000.0, 100)] {
            store
                .save(engagement_events::ActiveModel {
                    session_id: Set("s1".to_string()),
                    time_on_page: Set(time_on_page),
                    scroll_depth: Set(scroll_depth),
                    interaction_count: Set(1),
                    event_timestamp: Set(at(5)),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        assert_eq!(
            store.average_time_on_page(range(0, 10)).await.unwrap(),
            Some(2_000.0)
        );
        assert_eq!(
            store.average_scroll_depth(range(0, 10)).await.unwrap(),
            Some(75.0)
        );
    }

    #[tokio::test]
    async fn test_network_error_count_by_type() {
        let test_db = TestDatabase::with_migrations().await.unwrap();
        let store =
            SeaOrmEventStore::<network_error_events::Entity>::new(test_db.connection_arc());

        for (error_type, millis) in [("timeout", 1), ("timeout", 2), ("failed", 3)] {
            store
                .save(network_error_events::ActiveModel {
                    session_id: Set("s1".to_string()),
                    url: Set("https://api.example/orders".to_string()),
                    method: Set("GET".to_string()),
                    message: Set("request failed".to_string()),
                    duration: Set(10.0),
                    error_type: Set(error_type.to_string()),
                    event_timestamp: Set(at(millis)),
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        assert_eq!(
            store
                .count_by_error_type("timeout", range(0, 10))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .count_by_error_type("aborted", range(0, 10))
                .await
                .unwrap(),
            0
        );
    }
}
