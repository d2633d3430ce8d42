use serde::{Deserialize, Serialize};

/// Smallest lot size assumed when an exchange publishes none.
pub const MIN_LOT_SIZE: f64 = 0.000_000_01;
/// Smallest price increment assumed when an exchange publishes none.
pub const MIN_TICK_SIZE: f64 = 0.000_000_01;

/// Per-pair trading limits, stored under `{EXCHANGE}-Constraint-{pair.name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PairConstraint {
    pub pair: String,
    pub lot_size: f64,
    pub tick_size: f64,
}

impl PairConstraint {
    /// Builds limits from decimal-place precisions (`10^-decimals`). A side
    /// the exchange did not publish keeps the minimum sentinel.
    pub fn from_precision(
        pair: &str,
        lot_decimals: Option<i32>,
        tick_decimals: Option<i32>,
    ) -> PairConstraint {
        PairConstraint {
            pair: pair.to_string(),
            lot_size: lot_decimals.map_or(MIN_LOT_SIZE, |d| 10f64.powi(-d)),
            tick_size: tick_decimals.map_or(MIN_TICK_SIZE, |d| 10f64.powi(-d)),
        }
    }

    pub fn fallback(pair: &str) -> PairConstraint {
        PairConstraint {
            pair: pair.to_string(),
            lot_size: MIN_LOT_SIZE,
            tick_size: MIN_TICK_SIZE,
        }
    }
}

/// Per-coin wallet limits, stored under `{EXCHANGE}-Constraint-{coin.code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoinConstraint {
    pub coin: String,
    pub tx_fee: f64,
    pub withdraw: bool,
    pub deposit: bool,
    pub confirmation: u32,
}

/// Which constraint values an adapter can source from the exchange API, as
/// opposed to static defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintFetchMethod {
    pub fee: bool,
    pub lot_size: bool,
    pub tick_size: bool,
    pub tx_fee: bool,
    pub withdraw: bool,
    pub deposit: bool,
    pub confirmation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_to_step() {
        let c = PairConstraint::from_precision("USD|ETH", Some(8), Some(2));
        assert!((c.lot_size - 0.000_000_01).abs() < 1e-18);
        assert!((c.tick_size - 0.01).abs() < 1e-12);
    }

    #[test]
    fn missing_precision_keeps_minimum() {
        let c = PairConstraint::from_precision("USD|ETH", None, Some(0));
        assert_eq!(c.lot_size, MIN_LOT_SIZE);
        assert_eq!(c.tick_size, 1.0);

        let none = PairConstraint::from_precision("USD|ETH", None, None);
        assert_eq!(none, PairConstraint::fallback("USD|ETH"));
    }

    #[test]
    fn fallback_is_never_zero() {
        let c = PairConstraint::fallback("BTC|ETH");
        assert!(c.lot_size > 0.0);
        assert!(c.tick_size > 0.0);
    }
}
