use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Pair;

/// Exchange-native order identifier, normalised to a string whatever the
/// exchange's wire type (numeric ids, tx hashes, uuids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(id: impl Into<String>) -> OrderId {
        OrderId(id.into())
    }

    /// Normalises a JSON id field: strings are kept, numbers are printed.
    pub fn from_json(value: &Value) -> Option<OrderId> {
        match value {
            Value::String(s) if !s.is_empty() => Some(OrderId(s.clone())),
            Value::Number(n) => Some(OrderId(n.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}

/// Order lifecycle.
///
/// `New -> Partial -> Filled`, `New -> Rejected`, `New -> Canceling ->
/// Canceled`, `New -> Expired`. Anything an adapter cannot map lands in
/// `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Partial,
    Filled,
    Rejected,
    Canceling,
    Canceled,
    Expired,
    Other,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Rejected | OrderStatus::Canceled | OrderStatus::Expired
        )
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: OrderId,
    pub pair: Arc<Pair>,
    pub rate: f64,
    pub quantity: f64,
    pub side: Side,
    pub status: OrderStatus,
    /// Exchange answer to the placement call, kept for diagnostics only.
    pub raw_response: Value,
}

impl Order {
    pub fn placed(
        order_id: OrderId,
        pair: Arc<Pair>,
        side: Side,
        quantity: f64,
        rate: f64,
        raw_response: Value,
    ) -> Order {
        Order {
            order_id,
            pair,
            rate,
            quantity,
            side,
            status: OrderStatus::New,
            raw_response,
        }
    }
}
