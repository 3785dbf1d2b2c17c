use serde::{Deserialize, Serialize};

/// Running totals for one account, folded from its processed trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStats {
    pub account: String,
    pub trade_count: i64,
    pub cumulative_profit: f64,
}

impl AccountStats {
    /// Value reported for an account that has no processed trades yet.
    pub fn empty(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            trade_count: 0,
            cumulative_profit: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_are_zeroed() {
        let stats = AccountStats::empty("42");
        assert_eq!(stats.account, "42");
        assert_eq!(stats.trade_count, 0);
        assert_eq!(stats.cumulative_profit, 0.0);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let stats = AccountStats {
            account: "123".to_string(),
            trade_count: 2,
            cumulative_profit: 1000.0,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["account"], "123");
        assert_eq!(json["trade_count"], 2);
        assert_eq!(json["cumulative_profit"], 1000.0);
    }
}
