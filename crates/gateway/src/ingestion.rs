use std::sync::Arc;

use common::models::{AccountStats, NewTrade};
use storage::{DataManager, StorageError};

/// Write side of the pipeline: appends trades and reads back aggregates.
///
/// Never touches `account_stats` for writing; that belongs to the worker.
#[derive(Clone)]
pub struct IngestionGateway {
    data: Arc<DataManager>,
}

impl IngestionGateway {
    pub fn new(data: Arc<DataManager>) -> Self {
        Self { data }
    }

    /// Returns once the trade is durably queued, without waiting for aggregation.
    pub async fn submit(&self, trade: NewTrade) -> Result<i64, StorageError> {
        self.data.enqueue(&trade).await
    }

    pub async fn get_stats(&self, account: &str) -> Result<AccountStats, StorageError> {
        self.data.account_stats(account).await
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        self.data.ping().await
    }
}
