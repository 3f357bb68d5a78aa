//! Configuration management utilities

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ServiceError;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    /// Pool settings with defaults only; the environment is not consulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }

    /// Pool settings overridable through `RUM_DB_*` environment variables.
    pub fn from_env(url: impl Into<String>) -> Result<Self, ServiceError> {
        let defaults = Self::new(url);
        let config = Self {
            max_connections: env_or("RUM_DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: env_or("RUM_DB_MIN_CONNECTIONS", defaults.min_connections)?,
            connect_timeout_secs: env_or("RUM_DB_CONNECT_TIMEOUT", defaults.connect_timeout_secs)?,
            idle_timeout_secs: env_or("RUM_DB_IDLE_TIMEOUT", defaults.idle_timeout_secs)?,
            url: defaults.url,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.url.trim().is_empty() {
            return Err(ServiceError::Configuration {
                message: "database url must not be empty".to_string(),
            });
        }
        if self.min_connections > self.max_connections {
            return Err(ServiceError::Configuration {
                message: format!(
                    "min connections ({}) exceeds max connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Settings for the HTTP server and the ingestion pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub api_base_path: String,
    /// Number of batch items in flight at once; 1 keeps ingestion sequential
    pub ingest_concurrency: usize,
    pub database: DatabaseConfig,
}

impl ServerConfig {
    pub fn new(
        address: String,
        api_base_path: String,
        ingest_concurrency: usize,
        database: DatabaseConfig,
    ) -> Result<Self, ServiceError> {
        if ingest_concurrency == 0 {
            return Err(ServiceError::Configuration {
                message: "ingest concurrency must be at least 1".to_string(),
            });
        }
        let api_base_path = normalize_base_path(&api_base_path);
        Ok(Self {
            address,
            api_base_path,
            ingest_concurrency,
            database,
        })
    }
}

/// Strip trailing slashes and force a leading one, so `"api/rum/"` becomes `"/api/rum"`.
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T, ServiceError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| ServiceError::Configuration {
            message: format!("invalid value for {}: {}", key, e),
        }),
        Err(_) => Ok(default),
    }
}
