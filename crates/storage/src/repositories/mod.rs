pub mod account_stats_repo;
pub mod trade_queue_repo;

pub use account_stats_repo::AccountStatsRepository;
pub use trade_queue_repo::{TradeQueueRepository, TradeRow};
