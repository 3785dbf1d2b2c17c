use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::models::{AccountStats, NewTrade, Trade};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::db::{PoolSettings, connect_pool};
use crate::error::StorageError;
use crate::repositories::{AccountStatsRepository, TradeQueueRepository};

/// Owns the connection pool and bounds every storage call by `op_timeout`.
///
/// Constructed once per process and handed to the gateway and the worker;
/// connections are checked out per operation and returned when it ends.
pub struct DataManager {
    pool: SqlitePool,
    op_timeout: Duration,
}

impl DataManager {
    /// Fails unless `settings.busy_timeout` is strictly below `op_timeout`, so a
    /// write blocked on the database lock is rejected by SQLite first.
    pub async fn connect(
        settings: &PoolSettings,
        op_timeout: Duration,
    ) -> Result<Arc<Self>, StorageError> {
        if settings.busy_timeout >= op_timeout {
            return Err(StorageError::InvalidSettings(format!(
                "busy timeout {:?} must be below the operation timeout {:?}",
                settings.busy_timeout, op_timeout
            )));
        }

        let pool = connect_pool(settings).await?;
        Ok(Arc::new(Self { pool, op_timeout }))
    }

    /// Runs a storage future under the operation timeout.
    pub async fn timed<T, F>(&self, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StorageError::Timeout(self.op_timeout)),
        }
    }

    /// Appends a validated trade to the queue and returns its id.
    ///
    /// The INSERT is not raced against `op_timeout`; its wait for the write
    /// lock is bounded by the busy timeout, which fails it without effect.
    pub async fn enqueue(&self, trade: &NewTrade) -> Result<i64, StorageError> {
        let mut conn = self.timed(self.pool.acquire()).await?;
        let id = TradeQueueRepository::enqueue(&mut *conn, trade, Utc::now()).await?;
        debug!("Enqueued trade {} for account {}", id, trade.account);
        Ok(id)
    }

    pub async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Trade>, StorageError> {
        let rows = self
            .timed(TradeQueueRepository::fetch_unprocessed(
                &self.pool,
                i64::from(limit),
            ))
            .await?;
        rows.into_iter().map(Trade::try_from).collect()
    }

    pub async fn backlog(&self) -> Result<i64, StorageError> {
        self.timed(TradeQueueRepository::count_unprocessed(&self.pool))
            .await
    }

    /// Never fails for unknown accounts; they read as zero.
    pub async fn account_stats(&self, account: &str) -> Result<AccountStats, StorageError> {
        let stats = self
            .timed(AccountStatsRepository::get(&self.pool, account))
            .await?;
        Ok(stats.unwrap_or_else(|| AccountStats::empty(account)))
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StorageError> {
        self.timed(self.pool.begin()).await
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        self.timed(sqlx::query("SELECT 1").execute(&self.pool))
            .await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
