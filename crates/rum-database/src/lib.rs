//! Database connection and test utilities

pub use sea_orm;
mod connection;

pub use connection::{establish_connection, DbConnection};

// Export test utilities for use by other crates in their tests
pub mod test_utils;

#[cfg(test)]
mod tests {
    use super::*;
    use rum_core::{DatabaseConfig, ServiceError};
    use sea_orm::ConnectionTrait;

    #[tokio::test]
    async fn test_establish_connection_runs_migrations() -> anyhow::Result<()> {
        let mut config = DatabaseConfig::new("sqlite::memory:");
        config.max_connections = 1;
        config.min_connections = 1;

        let db = establish_connection(&config).await?;

        let row = db
            .query_one(sea_orm::Statement::from_string(
                db.get_database_backend(),
                "SELECT COUNT(*) AS n FROM web_vital_events".to_owned(),
            ))
            .await?;
        assert!(row.is_some());

        Ok(())
    }

    #[tokio::test]
    async fn test_establish_connection_rejects_invalid_config() {
        let config = DatabaseConfig::new("  ");

        let result = establish_connection(&config).await;
        assert!(matches!(result, Err(ServiceError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_test_database_is_migrated() -> anyhow::Result<()> {
        let test_db = test_utils::TestDatabase::with_migrations().await?;
        test_db.test_connection().await?;

        test_db
            .execute_sql("DELETE FROM page_speed_events")
            .await?;

        Ok(())
    }
}
