use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::actors::{Actor, ActorType, ControlMessage};
use common::models::Trade;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use crate::error::AggregationError;
use crate::traits::TradeLedger;

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    /// Idle wait after an empty (or entirely failed) poll.
    pub poll_interval: Duration,
    /// Upper bound on trades fetched per poll.
    pub batch_size: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            batch_size: 10,
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub committed: usize,
    pub failed: usize,
    pub fetch_failed: bool,
}

impl BatchReport {
    /// Whether the worker should wait `poll_interval` before polling again.
    pub fn should_idle(&self) -> bool {
        self.fetch_failed || self.fetched == 0 || self.failed == self.fetched
    }
}

/// Single-writer worker that folds queued trades into account statistics.
pub struct AggregationService<L: TradeLedger> {
    id: Uuid,
    ledger: Arc<L>,
    settings: WorkerSettings,
}

#[async_trait]
impl<L: TradeLedger + 'static> Actor for AggregationService<L> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::Aggregator
    }

    async fn run(
        &mut self,
        supervisor_tx: mpsc::Sender<ControlMessage>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());

        info!(
            "Aggregation worker started with polling interval {:?}, batch size {}",
            self.settings.poll_interval, self.settings.batch_size
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.process_batch(&cancel).await;

            if report.fetch_failed {
                let _ = supervisor_tx.try_send(ControlMessage::Error(
                    self.id,
                    format!("{:?}: failed to poll the trade queue", self.name()),
                ));
            }

            if report.should_idle() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = time::sleep(self.settings.poll_interval) => {}
                }
            }
        }

        heartbeat_handle.abort();
        let _ = supervisor_tx.send(ControlMessage::Shutdown(self.id)).await;
        info!("Aggregation worker stopped");
        Ok(())
    }
}

impl<L: TradeLedger> AggregationService<L> {
    pub fn new(ledger: Arc<L>, settings: WorkerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            ledger,
            settings,
        }
    }

    /// Fetches one batch and commits its trades one transaction at a time.
    ///
    /// `cancel` is checked before each trade; a trade whose transaction has
    /// started is always allowed to finish.
    pub async fn process_batch(&self, cancel: &CancellationToken) -> BatchReport {
        let mut report = BatchReport::default();

        let trades = match self.ledger.fetch_unprocessed(self.settings.batch_size).await {
            Ok(trades) => trades,
            Err(e) => {
                error!("Failed to query unprocessed trades: {}", e);
                report.fetch_failed = true;
                return report;
            }
        };

        if trades.is_empty() {
            trace!("No unprocessed trades");
            return report;
        }
        report.fetched = trades.len();

        for trade in &trades {
            if cancel.is_cancelled() {
                debug!(
                    "Cancellation requested, leaving {} fetched trades queued",
                    report.fetched - report.committed - report.failed
                );
                break;
            }

            match self.process_trade(trade).await {
                Ok(profit) => {
                    report.committed += 1;
                    info!(
                        "Processed trade {} for account {}: profit {:.2}",
                        trade.id, trade.account, profit
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    error!("Failed to process trade {}: {}", trade.id, e);
                }
            }
        }

        report
    }

    async fn process_trade(&self, trade: &Trade) -> Result<f64, AggregationError> {
        let profit = trade.profit();
        self.ledger.commit_trade(trade, profit).await?;
        Ok(profit)
    }
}
