use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profit::calculate_profit;

const SYMBOL_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// +1 for a long position, -1 for a short one.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ValidationError::InvalidSide(s.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("account must not be empty")]
    EmptyAccount,
    #[error("symbol must match the format ^[A-Z]{{6}}$, got '{0}'")]
    InvalidSymbol(String),
    #[error("{field} must be > 0")]
    NonPositive { field: &'static str },
    #[error("side must be either 'buy' or 'sell', got '{0}'")]
    InvalidSide(String),
}

/// Trade fill exactly as a client submitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSubmission {
    pub account: String,
    pub symbol: String,
    pub volume: f64,
    pub open: f64,
    pub close: f64,
    pub side: String,
}

/// A validated trade, ready to be appended to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrade {
    pub account: String,
    pub symbol: String,
    pub volume: f64,
    pub open: f64,
    pub close: f64,
    pub side: Side,
}

impl TryFrom<TradeSubmission> for NewTrade {
    type Error = ValidationError;

    fn try_from(raw: TradeSubmission) -> Result<Self, Self::Error> {
        if raw.account.trim().is_empty() {
            return Err(ValidationError::EmptyAccount);
        }

        let symbol_ok =
            raw.symbol.len() == SYMBOL_LEN && raw.symbol.bytes().all(|b| b.is_ascii_uppercase());
        if !symbol_ok {
            return Err(ValidationError::InvalidSymbol(raw.symbol));
        }

        for (field, value) in [("volume", raw.volume), ("open", raw.open), ("close", raw.close)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::NonPositive { field });
            }
        }

        let side = raw.side.parse::<Side>()?;

        Ok(Self {
            account: raw.account,
            symbol: raw.symbol,
            volume: raw.volume,
            open: raw.open,
            close: raw.close,
            side,
        })
    }
}

/// Queue entry. Immutable once `processed` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: i64,
    pub account: String,
    pub symbol: String,
    pub volume: f64,
    pub open: f64,
    pub close: f64,
    pub side: Side,
    pub processed: bool,
    pub enqueued_at: DateTime<Utc>,
}

impl Trade {
    pub fn profit(&self) -> f64 {
        calculate_profit(self.side, self.open, self.close, self.volume)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> TradeSubmission {
        TradeSubmission {
            account: "123".to_string(),
            symbol: "EURUSD".to_string(),
            volume: 1.0,
            open: 1.1000,
            close: 1.1050,
            side: "buy".to_string(),
        }
    }

    #[test]
    fn accepts_valid_trade() {
        let trade = NewTrade::try_from(submission()).unwrap();
        assert_eq!(trade.account, "123");
        assert_eq!(trade.side, Side::Buy);
    }

    #[test]
    fn rejects_empty_account() {
        let raw = TradeSubmission {
            account: "   ".to_string(),
            ..submission()
        };
        assert_eq!(NewTrade::try_from(raw), Err(ValidationError::EmptyAccount));
    }

    #[test]
    fn rejects_bad_symbols() {
        for symbol in ["EUR", "eurusd", "EURUSDX", "EUR1SD", ""] {
            let raw = TradeSubmission {
                symbol: symbol.to_string(),
                ..submission()
            };
            assert!(
                matches!(NewTrade::try_from(raw), Err(ValidationError::InvalidSymbol(_))),
                "symbol {symbol:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_non_positive_numbers() {
        let zero_volume = TradeSubmission {
            volume: 0.0,
            ..submission()
        };
        assert_eq!(
            NewTrade::try_from(zero_volume),
            Err(ValidationError::NonPositive { field: "volume" })
        );

        let negative_open = TradeSubmission {
            open: -1.0,
            ..submission()
        };
        assert_eq!(
            NewTrade::try_from(negative_open),
            Err(ValidationError::NonPositive { field: "open" })
        );

        let nan_close = TradeSubmission {
            close: f64::NAN,
            ..submission()
        };
        assert_eq!(
            NewTrade::try_from(nan_close),
            Err(ValidationError::NonPositive { field: "close" })
        );
    }

    #[test]
    fn side_is_case_insensitive() {
        let raw = TradeSubmission {
            side: "SELL".to_string(),
            ..submission()
        };
        assert_eq!(NewTrade::try_from(raw).unwrap().side, Side::Sell);
    }

    #[test]
    fn rejects_unknown_side() {
        let raw = TradeSubmission {
            side: "invalid".to_string(),
            ..submission()
        };
        assert!(matches!(
            NewTrade::try_from(raw),
            Err(ValidationError::InvalidSide(_))
        ));
    }

    #[test]
    fn validation_messages_are_readable() {
        assert_eq!(
            ValidationError::InvalidSymbol("EUR".into()).to_string(),
            "symbol must match the format ^[A-Z]{6}$, got 'EUR'"
        );
        assert_eq!(
            ValidationError::NonPositive { field: "volume" }.to_string(),
            "volume must be > 0"
        );
    }
}
