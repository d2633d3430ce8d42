//! Canonical market model shared by every exchange adapter.

pub mod constraint;
pub mod maker;
pub mod market;
pub mod order;

pub use constraint::{CoinConstraint, ConstraintFetchMethod, PairConstraint};
pub use maker::{Level, Maker};
pub use market::{Coin, MarketRegistry, Pair};
pub use order::{Order, OrderId, OrderStatus, Side};
