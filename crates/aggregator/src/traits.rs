use async_trait::async_trait;
use common::models::Trade;
use storage::repositories::{AccountStatsRepository, TradeQueueRepository};
use storage::{DataManager, StorageError};

use crate::error::AggregationError;

/// What the aggregation worker needs from storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TradeLedger: Send + Sync {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Trade>, StorageError>;

    /// Adds `profit` to the trade's account and flags the trade processed,
    /// both in one transaction. On any error neither change is kept.
    async fn commit_trade(&self, trade: &Trade, profit: f64) -> Result<(), AggregationError>;
}

#[async_trait]
impl TradeLedger for DataManager {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Trade>, StorageError> {
        DataManager::fetch_unprocessed(self, limit).await
    }

    async fn commit_trade(&self, trade: &Trade, profit: f64) -> Result<(), AggregationError> {
        let mut tx = self.begin().await?;

        self.timed(AccountStatsRepository::upsert(
            &mut *tx,
            &trade.account,
            1,
            profit,
        ))
        .await?;

        let marked = self
            .timed(TradeQueueRepository::mark_processed(&mut *tx, trade.id))
            .await?;
        if marked != 1 {
            // Dropping `tx` rolls the stats update back.
            return Err(AggregationError::AlreadyProcessed(trade.id));
        }

        self.timed(tx.commit())
            .await
            .map_err(|source| AggregationError::Commit {
                id: trade.id,
                source,
            })
    }
}
