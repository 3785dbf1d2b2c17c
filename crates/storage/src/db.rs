use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{self, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

const SCHEMA: &str = include_str!("../../../sql/schema.sql");

/// Connection pool sizing shared by the HTTP handlers and the worker.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    pub max_lifetime: Duration,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            max_connections: 25,
            min_connections: 5,
            max_lifetime: Duration::from_secs(5 * 60),
            busy_timeout: Duration::from_secs(3),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Opens (creating if needed) the queue database and applies the schema.
pub async fn connect_pool(settings: &PoolSettings) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = settings.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&settings.database_path)
        .create_if_missing(true)
        .journal_mode(sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlite::SqliteSynchronous::Normal)
        .busy_timeout(settings.busy_timeout)
        .statement_cache_capacity(100);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections.min(settings.max_connections))
        .max_lifetime(settings.max_lifetime)
        .acquire_timeout(settings.acquire_timeout)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;

    info!(
        "Database ready at {} (max {} connections)",
        settings.database_path.display(),
        settings.max_connections
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_schema_in_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::new(dir.path().join("nested/queue.db"));

        let pool = connect_pool(&settings).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            r#"
                SELECT name FROM sqlite_master
                WHERE type = 'table' AND name IN ('trades_q', 'account_stats')
                ORDER BY name
            "#,
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["account_stats", "trades_q"]);

        let index: Option<String> = sqlx::query_scalar(
            r#"
                SELECT name FROM sqlite_master
                WHERE type = 'index' AND name = 'idx_trades_q_processed'
            "#,
        )
        .fetch_optional(&pool)
        .await
        .unwrap();
        assert!(index.is_some());
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PoolSettings::new(dir.path().join("queue.db"));

        let first = connect_pool(&settings).await.unwrap();
        first.close().await;

        assert!(connect_pool(&settings).await.is_ok());
    }

    #[tokio::test]
    async fn small_pool_clamps_idle_connections() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = PoolSettings::new(dir.path().join("queue.db"));
        settings.max_connections = 2;

        let pool = connect_pool(&settings).await.unwrap();
        assert!(pool.size() <= 2);
    }
}
