//! Test helpers: every `TestDatabase` is a private, fully migrated in-memory SQLite database.

use crate::DbConnection;
use rum_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, ExecResult, Statement};
use std::sync::Arc;

const IN_MEMORY_URL: &str = "sqlite::memory:";

pub struct TestDatabase {
    pub db: Arc<DbConnection>,
    pub database_url: String,
}

impl TestDatabase {
    /// Create an empty database without any tables
    pub async fn new() -> anyhow::Result<Self> {
        // A single pooled connection keeps the in-memory database alive and shared
        let mut opt = ConnectOptions::new(IN_MEMORY_URL.to_owned());
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;

        Ok(TestDatabase {
            db: Arc::new(db),
            database_url: IN_MEMORY_URL.to_string(),
        })
    }

    /// Create a database with every telemetry table in place
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let test_db = Self::new().await?;
        Migrator::up(test_db.db.as_ref(), None).await?;
        Ok(test_db)
    }

    /// Execute raw SQL for testing
    pub async fn execute_sql(&self, sql: &str) -> anyhow::Result<ExecResult> {
        let statement = Statement::from_string(self.db.get_database_backend(), sql.to_owned());
        let result = self.db.execute(statement).await?;
        Ok(result)
    }

    /// Test database connectivity
    pub async fn test_connection(&self) -> anyhow::Result<()> {
        let statement =
            Statement::from_string(self.db.get_database_backend(), "SELECT 1".to_owned());
        let result = self.db.query_one(statement).await?;

        if result.is_none() {
            return Err(anyhow::anyhow!("Connection test failed"));
        }

        Ok(())
    }

    /// Get the database connection
    pub fn connection(&self) -> &DbConnection {
        &self.db
    }

    /// Get the database connection as Arc
    pub fn connection_arc(&self) -> Arc<DbConnection> {
        Arc::clone(&self.db)
    }
}
