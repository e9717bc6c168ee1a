use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::{retry_with_backoff, DatabaseError};

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
    pub connect_retries: usize,
    pub retry_delay: Duration,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: 20,
            connect_retries: 3,
            retry_delay: Duration::from_millis(100),
        }
    }

    pub fn from_cli_or_env_or_yaml(cli_arg: Option<String>, yaml_config: Option<String>) -> Self {
        let url = if let Some(arg) = cli_arg {
            arg
        } else if let Ok(env) = std::env::var("DATABASE_URL") {
            env
        } else if let Some(yaml) = yaml_config {
            yaml
        } else {
            DEFAULT_DATABASE_URL.to_string()
        };

        Self::new(url)
    }

    /// Each connection to an in-memory SQLite database opens a separate,
    /// empty database, so those pools are limited to one long-lived connection.
    pub fn is_in_memory(&self) -> bool {
        self.url == ":memory:" || self.url == "sqlite::memory:" || self.url.contains("mode=memory")
    }

    pub fn connect_options(&self) -> Result<SqliteConnectOptions, DatabaseError> {
        let options = if self.url.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(&self.url)
                .map_err(|e| DatabaseError::Connection(e.to_string()))?
        } else {
            SqliteConnectOptions::new().filename(&self.url)
        };

        let options = options
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if self.is_in_memory() {
            Ok(options)
        } else {
            // WAL lets readers proceed while a writer holds the lock.
            Ok(options.journal_mode(SqliteJournalMode::Wal))
        }
    }

    pub async fn create_pool(&self) -> Result<SqlitePool, DatabaseError> {
        let options = self.connect_options()?;
        let pool_options = if self.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(self.pool_size)
        };

        tracing::info!(url = %self.url, "connecting to database");
        retry_with_backoff(
            || {
                let options = options.clone();
                let pool_options = pool_options.clone();
                async move {
                    pool_options
                        .connect_with(options)
                        .await
                        .map_err(|e| DatabaseError::Connection(e.to_string()))
                }
            },
            self.connect_retries,
            self.retry_delay,
        )
        .await
        .map_err(|e| {
            DatabaseError::RetryExhausted(format!(
                "{} after {} attempts: {e}",
                self.url,
                self.connect_retries + 1
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_argument_wins() {
        let config = DatabaseConfig::from_cli_or_env_or_yaml(
            Some("games.db".to_string()),
            Some("other.db".to_string()),
        );
        assert_eq!(config.url, "games.db");
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(DatabaseConfig::new("sqlite::memory:").is_in_memory());
        assert!(DatabaseConfig::new(":memory:").is_in_memory());
        assert!(DatabaseConfig::new("sqlite://file:games?mode=memory&cache=shared").is_in_memory());
        assert!(!DatabaseConfig::new("sqlite://games.db").is_in_memory());
    }

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = DatabaseConfig::new(DEFAULT_DATABASE_URL)
            .create_pool()
            .await
            .expect("in-memory pool");
        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query");
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn test_file_pool_uses_wal() {
        let path = std::env::temp_dir().join(format!("games-{}.db", uuid::Uuid::new_v4()));
        let url = path.to_string_lossy().to_string();
        let pool = DatabaseConfig::new(url.as_str())
            .create_pool()
            .await
            .expect("file pool");
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("pragma");
        assert_eq!(mode.to_lowercase(), "wal");

        pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{url}{suffix}"));
        }
    }
}
