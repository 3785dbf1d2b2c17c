pub mod stats;
pub mod trade;

pub use stats::AccountStats;
pub use trade::{NewTrade, Side, Trade, TradeSubmission, ValidationError};
