use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A standard asset code, always stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Coin {
    pub code: String,
}

impl Coin {
    pub fn new(code: &str) -> Coin {
        Coin {
            code: code.trim().to_uppercase(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

/// An ordered `(base, target)` combination. `base` is the quote currency the
/// price is expressed in, `target` the asset being traded.
#[derive(Debug, Clone)]
pub struct Pair {
    pub base: Arc<Coin>,
    pub target: Arc<Coin>,
    pub name: String,
}

impl Pair {
    pub fn key(base: &str, target: &str) -> String {
        format!("{}|{}", base.to_uppercase(), target.to_uppercase())
    }
}

impl PartialEq for Pair {
    fn eq(&self, other: &Pair) -> bool {
        self.name == other.name
    }
}

impl Eq for Pair {}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Append-only registry of coins and pairs, shared by all adapters.
///
/// Concurrent inserts of the same code resolve through the map entry lock:
/// the first writer's value is kept and every caller receives it.
#[derive(Debug, Default)]
pub struct MarketRegistry {
    coins: DashMap<String, Arc<Coin>>,
    pairs: DashMap<String, Arc<Pair>>,
}

impl MarketRegistry {
    pub fn new() -> MarketRegistry {
        MarketRegistry::default()
    }

    pub fn get_or_create_coin(&self, code: &str) -> Arc<Coin> {
        let coin = Coin::new(code);
        self.coins
            .entry(coin.code.clone())
            .or_insert_with(|| Arc::new(coin))
            .value()
            .clone()
    }

    pub fn get_or_create_pair(&self, base: &Arc<Coin>, target: &Arc<Coin>) -> Arc<Pair> {
        let base = self.get_or_create_coin(&base.code);
        let target = self.get_or_create_coin(&target.code);
        let name = Pair::key(&base.code, &target.code);
        self.pairs
            .entry(name.clone())
            .or_insert_with(|| Arc::new(Pair { base, target, name }))
            .value()
            .clone()
    }

    /// Convenience for `get_or_create_pair` starting from raw codes.
    pub fn pair_for_codes(&self, base: &str, target: &str) -> Arc<Pair> {
        let base = self.get_or_create_coin(base);
        let target = self.get_or_create_coin(target);
        self.get_or_create_pair(&base, &target)
    }

    pub fn coin(&self, code: &str) -> Option<Arc<Coin>> {
        self.coins
            .get(&code.trim().to_uppercase())
            .map(|c| c.value().clone())
    }

    /// Looks a pair up by its composite key, e.g. `"BTC|ETH"`.
    pub fn pair_by_key(&self, key: &str) -> Option<Arc<Pair>> {
        self.pairs
            .get(&key.to_uppercase())
            .map(|p| p.value().clone())
    }

    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }
}
