use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::model::Coin;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Balance {
    pub currency: String,
    pub amount: f64,
    pub exchange: String,
}

/// Available balances of one adapter, one entry per standard coin code.
#[derive(Debug)]
pub struct BalanceBook {
    exchange: String,
    balances: DashMap<String, f64>,
}

impl BalanceBook {
    pub fn new(exchange: impl Into<String>) -> BalanceBook {
        BalanceBook {
            exchange: exchange.into(),
            balances: DashMap::new(),
        }
    }

    pub fn set(&self, coin: &Coin, amount: f64) {
        self.balances.insert(coin.code.clone(), amount);
    }

    /// Last known balance, or `0.0` when the coin was never fetched.
    pub fn get(&self, coin: &Coin) -> f64 {
        self.balances.get(&coin.code).map(|v| *v).unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Balance> {
        let sorted: BTreeMap<String, f64> = self
            .balances
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        sorted
            .into_iter()
            .map(|(currency, amount)| Balance {
                currency,
                amount,
                exchange: self.exchange.clone(),
            })
            .collect()
    }

    pub fn serialize_to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }
}

/// Parses an amount that exchanges send either as a JSON string or number.
pub fn parse_amount(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
