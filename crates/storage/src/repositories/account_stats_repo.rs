use common::models::AccountStats;
use sqlx::{SqliteConnection, SqlitePool};

pub struct AccountStatsRepository;

impl AccountStatsRepository {
    /// Inserts the account with the given deltas or adds them to its totals.
    pub async fn upsert(
        conn: &mut SqliteConnection,
        account: &str,
        delta_trade_count: i64,
        delta_profit: f64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
                INSERT INTO account_stats (account, trade_count, cumulative_profit)
                VALUES (?, ?, ?)
                ON CONFLICT(account) DO UPDATE SET
                    trade_count = trade_count + excluded.trade_count,
                    cumulative_profit = cumulative_profit + excluded.cumulative_profit
            "#,
        )
        .bind(account)
        .bind(delta_trade_count)
        .bind(delta_profit)
        .execute(conn)
        .await?;
        Ok(())
    }

    pub async fn get(
        pool: &SqlitePool,
        account: &str,
    ) -> Result<Option<AccountStats>, sqlx::Error> {
        let row = sqlx::query_as::<_, (String, i64, f64)>(
            "SELECT account, trade_count, cumulative_profit FROM account_stats WHERE account = ?",
        )
        .bind(account)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(account, trade_count, cumulative_profit)| AccountStats {
            account,
            trade_count,
            cumulative_profit,
        }))
    }
}
