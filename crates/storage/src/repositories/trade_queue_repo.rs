use chrono::{DateTime, Utc};
use common::models::{NewTrade, Trade};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::error::StorageError;

#[derive(Debug, Clone, FromRow)]
pub struct TradeRow {
    pub id: i64,
    pub account: String,
    pub symbol: String,
    pub volume: f64,
    pub open: f64,
    pub close: f64,
    pub side: String,
    pub processed: bool,
    pub enqueued_at: DateTime<Utc>,
}

impl TryFrom<TradeRow> for Trade {
    type Error = StorageError;

    fn try_from(row: TradeRow) -> Result<Self, Self::Error> {
        let side = row.side.parse().map_err(|e| StorageError::Corrupt {
            id: row.id,
            reason: format!("{}", e),
        })?;

        Ok(Trade {
            id: row.id,
            account: row.account,
            symbol: row.symbol,
            volume: row.volume,
            open: row.open,
            close: row.close,
            side,
            processed: row.processed,
            enqueued_at: row.enqueued_at,
        })
    }
}

/// Append-only trade queue backed by `trades_q`.
pub struct TradeQueueRepository;

impl TradeQueueRepository {
    pub async fn enqueue(
        conn: &mut SqliteConnection,
        trade: &NewTrade,
        enqueued_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
                INSERT INTO trades_q (
                    account, symbol, volume, open, close, side, enqueued_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                RETURNING id
            "#,
        )
        .bind(&trade.account)
        .bind(&trade.symbol)
        .bind(trade.volume)
        .bind(trade.open)
        .bind(trade.close)
        .bind(trade.side.as_str())
        .bind(enqueued_at)
        .fetch_one(conn)
        .await
    }

    /// Oldest unprocessed entries first, at most `limit` of them.
    pub async fn fetch_unprocessed(
        pool: &SqlitePool,
        limit: i64,
    ) -> Result<Vec<TradeRow>, sqlx::Error> {
        sqlx::query_as::<_, TradeRow>(
            r#"
                SELECT id, account, symbol, volume, open, close, side, processed, enqueued_at
                FROM trades_q
                WHERE processed = 0
                ORDER BY id ASC
                LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Flags one entry as processed. Only meant to run inside the
    /// transaction that also folds the trade into `account_stats`.
    ///
    /// Returns the number of rows changed: 0 when the entry is unknown or was
    /// already processed.
    pub async fn mark_processed(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE trades_q SET processed = 1 WHERE id = ? AND processed = 0")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_unprocessed(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trades_q WHERE processed = 0")
            .fetch_one(pool)
            .await
    }
}
