use crate::models::Side;

/// Units per standard lot.
pub const CONTRACT_SIZE: f64 = 100_000.0;

/// Signed profit of a closed position: `sign(side) * (close - open) * volume * CONTRACT_SIZE`.
pub fn calculate_profit(side: Side, open: f64, close: f64, volume: f64) -> f64 {
    side.sign() * (close - open) * volume * CONTRACT_SIZE
}
