//! PostgreSQL pool for the feed CLI.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{debug, instrument};

use reel_core::error::{StorageError, StorageResult};

/// Pool settings for one CLI invocation.
///
/// Page assembly reads buckets one at a time, so a command never holds
/// more than one connection; the pool stays small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    pub max_connections: u32,
    /// How long to wait for a free connection before failing the command.
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn for_cli(url: &str) -> Self {
        Self {
            url: url.to_string(),
            max_connections: 2,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

/// Connection pool over the `latest_videos` schema.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    #[instrument(skip_all, fields(max_conn = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;

        debug!("Connection pool created");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded `./migrations`.
    #[instrument(skip(self))]
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StorageError::MigrationError(e.to_string()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Delete every feed row; the schema and migration history stay.
    #[instrument(skip(self))]
    pub async fn purge(&self) -> StorageResult<PurgeStats> {
        let result = sqlx::query("DELETE FROM latest_videos")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        debug!(rows = result.rows_affected(), "Feed purged");

        Ok(PurgeStats {
            videos_removed: result.rows_affected(),
        })
    }
}

/// Outcome of [`Database::purge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    pub videos_removed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_keeps_url_and_small_pool() {
        let config = DatabaseConfig::for_cli("postgres://reel:secret@db/reel_test");
        assert_eq!(config.url, "postgres://reel:secret@db/reel_test");
        assert!(config.max_connections >= 1 && config.max_connections <= 2);
        assert!(config.acquire_timeout > Duration::ZERO);
    }
}
