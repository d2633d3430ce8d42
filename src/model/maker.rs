use serde::{Deserialize, Serialize};

/// One price level of a book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Level {
    pub rate: f64,
    pub quantity: f64,
}

impl Level {
    pub fn new(rate: f64, quantity: f64) -> Level {
        Level { rate, quantity }
    }
}

/// A single order-book snapshot. Level order is the exchange's own and is
/// never re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Maker {
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
    /// Milliseconds since the epoch.
    pub timestamp: f64,
    #[serde(rename = "WorkerIP", default)]
    pub worker_ip: String,
}

impl Maker {
    pub fn new(bids: Vec<Level>, asks: Vec<Level>, timestamp: f64) -> Maker {
        Maker {
            bids,
            asks,
            timestamp,
            worker_ip: String::new(),
        }
    }

    pub fn best_bid(&self) -> Option<&Level> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Level> {
        self.asks.first()
    }
}
