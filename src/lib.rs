//! Uniform access to spot crypto exchanges: market discovery, order books,
//! balances, limit orders and signed requests, plus a shared snapshot and
//! constraint cache.

pub mod cache;
pub mod error;
pub mod exchanges;
pub mod model;
pub mod signing;
pub mod symbol;
pub mod transport;
pub mod utils;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub use error::{Error, Result};
pub use exchanges::{AdapterRegistry, Exchange, ExchangeName};
pub use model::{Coin, Maker, MarketRegistry, Order, OrderStatus, Pair, Side};
