//! Snapshot and constraint cache on top of a Get/Set key-value store.
//!
//! Keys: `{EXCHANGE}-{pair.name}` for order-book snapshots and
//! `{EXCHANGE}-Constraint-{pair.name | coin.code}` for constraints.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Coin, CoinConstraint, Maker, Pair, PairConstraint};

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
}

/// Process-local store, used when no redis server is configured.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// `server` is `host:port`; `db` selects the logical database.
    pub async fn connect(server: &str, db: i64) -> Result<RedisStore> {
        let url = format!("redis://{server}/{db}");
        let client = redis::Client::open(url)?;
        let connection = client.get_connection_manager().await?;
        Ok(RedisStore { connection })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }
}

/// Typed view over a [`KeyValueStore`] for one exchange.
#[derive(Clone)]
pub struct MarketCache {
    exchange: String,
    store: Arc<dyn KeyValueStore>,
}

impl MarketCache {
    pub fn new(exchange: impl Into<String>, store: Arc<dyn KeyValueStore>) -> MarketCache {
        MarketCache {
            exchange: exchange.into(),
            store,
        }
    }

    pub fn snapshot_key(&self, pair: &Pair) -> String {
        format!("{}-{}", self.exchange, pair.name)
    }

    pub fn pair_constraint_key(&self, pair: &Pair) -> String {
        format!("{}-Constraint-{}", self.exchange, pair.name)
    }

    pub fn coin_constraint_key(&self, coin: &Coin) -> String {
        format!("{}-Constraint-{}", self.exchange, coin.code)
    }

    pub async fn put_snapshot(&self, pair: &Pair, maker: &Maker) -> Result<()> {
        self.put(&self.snapshot_key(pair), maker).await
    }

    pub async fn get_snapshot(&self, pair: &Pair) -> Result<Maker> {
        self.fetch(&self.snapshot_key(pair)).await
    }

    pub async fn put_pair_constraint(&self, pair: &Pair, constraint: &PairConstraint) -> Result<()> {
        self.put(&self.pair_constraint_key(pair), constraint).await
    }

    pub async fn get_pair_constraint(&self, pair: &Pair) -> Result<PairConstraint> {
        self.fetch(&self.pair_constraint_key(pair)).await
    }

    pub async fn put_coin_constraint(&self, coin: &Coin, constraint: &CoinConstraint) -> Result<()> {
        self.put(&self.coin_constraint_key(coin), constraint).await
    }

    pub async fn get_coin_constraint(&self, coin: &Coin) -> Result<CoinConstraint> {
        self.fetch(&self.coin_constraint_key(coin)).await
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_string(value)
            .map_err(|e| Error::InvalidInput(format!("cannot encode value for {key}: {e}")))?;
        debug!(key, bytes = encoded.len(), "cache write");
        self.store.set(key, encoded).await
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let raw = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| Error::NotFound { key: key.to_string() })?;
        serde_json::from_str(&raw).map_err(|source| Error::Decode {
            key: key.to_string(),
            source,
        })
    }
}
