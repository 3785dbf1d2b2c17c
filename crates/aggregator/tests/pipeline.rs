use std::sync::Arc;
use std::time::Duration;

use aggregator::{AggregationError, AggregationService, TradeLedger, WorkerSettings};
use common::actors::Actor;
use common::models::{AccountStats, NewTrade, Side};
use common::profit::calculate_profit;
use storage::repositories::{AccountStatsRepository, TradeQueueRepository};
use storage::{DataManager, PoolSettings};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const EPSILON: f64 = 1e-9;

async fn scratch() -> (TempDir, Arc<DataManager>) {
    let dir = tempfile::tempdir().unwrap();
    let settings = PoolSettings::new(dir.path().join("trades.db"));
    let data = DataManager::connect(&settings, Duration::from_secs(10))
        .await
        .unwrap();
    (dir, data)
}

fn worker(data: &Arc<DataManager>) -> AggregationService<DataManager> {
    AggregationService::new(
        data.clone(),
        WorkerSettings {
            poll_interval: Duration::from_millis(10),
            batch_size: 10,
        },
    )
}

fn trade(account: &str, open: f64, close: f64, volume: f64, side: Side) -> NewTrade {
    NewTrade {
        account: account.to_string(),
        symbol: "EURUSD".to_string(),
        volume,
        open,
        close,
        side,
    }
}

/// Polls until the queue is empty, failing the test if it never drains.
async fn drain(service: &AggregationService<DataManager>, data: &DataManager) {
    let cancel = CancellationToken::new();
    for _ in 0..1_000 {
        service.process_batch(&cancel).await;
        if data.backlog().await.unwrap() == 0 {
            return;
        }
    }
    panic!("queue did not drain");
}

#[tokio::test]
async fn end_to_end_buy_then_sell() {
    let (_dir, data) = scratch().await;
    let service = worker(&data);

    data.enqueue(&trade("123", 1.1000, 1.1050, 1.0, Side::Buy))
        .await
        .unwrap();
    drain(&service, &data).await;

    let stats = data.account_stats("123").await.unwrap();
    assert_eq!(stats.account, "123");
    assert_eq!(stats.trade_count, 1);
    assert!((stats.cumulative_profit - 500.0).abs() < EPSILON);

    data.enqueue(&trade("123", 1.1050, 1.1000, 1.0, Side::Sell))
        .await
        .unwrap();
    drain(&service, &data).await;

    let stats = data.account_stats("123").await.unwrap();
    assert_eq!(stats.trade_count, 2);
    assert!((stats.cumulative_profit - 1000.0).abs() < EPSILON);
}

#[tokio::test]
async fn totals_are_conserved_across_batches() {
    let (_dir, data) = scratch().await;
    let service = worker(&data);

    let mut expected = 0.0;
    let mut submitted = 0;
    for i in 0..37 {
        let side = if i % 3 == 0 { Side::Sell } else { Side::Buy };
        let open = 1.0 + f64::from(i) * 0.001;
        let close = open + 0.0005 * f64::from(i % 5) - 0.001;
        let volume = 0.5 + f64::from(i % 4);
        let t = trade("A", open, close, volume, side);
        expected += calculate_profit(t.side, t.open, t.close, t.volume);
        data.enqueue(&t).await.unwrap();
        submitted += 1;
    }
    data.enqueue(&trade("B", 1.0, 2.0, 1.0, Side::Buy))
        .await
        .unwrap();

    drain(&service, &data).await;

    let stats = data.account_stats("A").await.unwrap();
    assert_eq!(stats.trade_count, submitted);
    assert!((stats.cumulative_profit - expected).abs() < 1e-6);
    assert_eq!(data.account_stats("B").await.unwrap().trade_count, 1);
}

#[tokio::test]
async fn unknown_account_reads_as_zero_after_other_activity() {
    let (_dir, data) = scratch().await;
    let service = worker(&data);

    data.enqueue(&trade("someone", 1.0, 1.1, 1.0, Side::Buy))
        .await
        .unwrap();
    drain(&service, &data).await;

    assert_eq!(
        data.account_stats("nobody").await.unwrap(),
        AccountStats::empty("nobody")
    );
}

#[tokio::test]
async fn concurrent_submissions_lose_no_updates() {
    const SUBMISSIONS: usize = 64;
    let (_dir, data) = scratch().await;

    let mut worker = worker(&data);
    let (tx, _rx) = mpsc::channel(1024);
    let cancel = CancellationToken::new();
    let worker_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { worker.run(tx, cancel).await }
    });

    let submitters: Vec<_> = (0..SUBMISSIONS)
        .map(|_| {
            let data = data.clone();
            tokio::spawn(async move {
                data.enqueue(&trade("shared", 1.1000, 1.1050, 1.0, Side::Buy))
                    .await
            })
        })
        .collect();
    for handle in submitters {
        handle.await.unwrap().unwrap();
    }

    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            if data.backlog().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("worker did not drain concurrent submissions");

    cancel.cancel();
    worker_handle.await.unwrap().unwrap();

    let stats = data.account_stats("shared").await.unwrap();
    assert_eq!(stats.trade_count, SUBMISSIONS as i64);
    assert!((stats.cumulative_profit - 500.0 * SUBMISSIONS as f64).abs() < 1e-6);
}

#[tokio::test]
async fn crash_before_commit_is_retried_without_double_counting() {
    let (_dir, data) = scratch().await;
    let id = data
        .enqueue(&trade("123", 1.1000, 1.1050, 1.0, Side::Buy))
        .await
        .unwrap();

    // Both writes land, then the process "dies" before COMMIT.
    {
        let mut tx = data.begin().await.unwrap();
        AccountStatsRepository::upsert(&mut *tx, "123", 1, 500.0)
            .await
            .unwrap();
        TradeQueueRepository::mark_processed(&mut *tx, id)
            .await
            .unwrap();
    }

    assert_eq!(data.backlog().await.unwrap(), 1);
    assert_eq!(data.account_stats("123").await.unwrap().trade_count, 0);

    let service = worker(&data);
    drain(&service, &data).await;

    let stats = data.account_stats("123").await.unwrap();
    assert_eq!(stats.trade_count, 1);
    assert!((stats.cumulative_profit - 500.0).abs() < EPSILON);
}

#[tokio::test]
async fn committing_the_same_trade_twice_is_rejected() {
    let (_dir, data) = scratch().await;
    data.enqueue(&trade("123", 1.1000, 1.1050, 1.0, Side::Buy))
        .await
        .unwrap();
    let fetched = data.fetch_unprocessed(10).await.unwrap();
    let stale = fetched[0].clone();

    data.commit_trade(&stale, stale.profit()).await.unwrap();
    let second = data.commit_trade(&stale, stale.profit()).await;

    assert!(matches!(second, Err(AggregationError::AlreadyProcessed(_))));
    let stats = data.account_stats("123").await.unwrap();
    assert_eq!(stats.trade_count, 1);
    assert!((stats.cumulative_profit - 500.0).abs() < EPSILON);
}

#[tokio::test]
async fn restart_resumes_where_the_previous_worker_stopped() {
    let (_dir, data) = scratch().await;
    for _ in 0..25 {
        data.enqueue(&trade("123", 1.1000, 1.1050, 1.0, Side::Buy))
            .await
            .unwrap();
    }

    // First worker handles a single batch, then is "stopped".
    let first = worker(&data);
    let report = first.process_batch(&CancellationToken::new()).await;
    assert_eq!(report.committed, 10);
    drop(first);

    let second = worker(&data);
    drain(&second, &data).await;

    let stats = data.account_stats("123").await.unwrap();
    assert_eq!(stats.trade_count, 25);
    assert!((stats.cumulative_profit - 12_500.0).abs() < 1e-6);
}
