use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::{AdapterContext, Bitrue, Coineal, Exchange, ExchangeName, Fcoin, Kraken};
use crate::cache::{KeyValueStore, MemoryStore, RedisStore};
use crate::error::Result;
use crate::model::MarketRegistry;
use crate::transport::Transport;
use crate::utils::config::Settings;

/// Builds each adapter at most once, on first use, and hands out shared
/// handles to it.
pub struct AdapterRegistry {
    settings: Settings,
    market: Arc<MarketRegistry>,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn KeyValueStore>>,
    memory: MemoryStore,
    kraken: OnceCell<Arc<Kraken>>,
    bitrue: OnceCell<Arc<Bitrue>>,
    coineal: OnceCell<Arc<Coineal>>,
    fcoin: OnceCell<Arc<Fcoin>>,
}

impl AdapterRegistry {
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> AdapterRegistry {
        AdapterRegistry {
            settings,
            market: Arc::new(MarketRegistry::new()),
            transport,
            store: None,
            memory: MemoryStore::new(),
            kraken: OnceCell::new(),
            bitrue: OnceCell::new(),
            coineal: OnceCell::new(),
            fcoin: OnceCell::new(),
        }
    }

    /// Uses `store` for every adapter instead of the configured redis servers.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> AdapterRegistry {
        self.store = Some(store);
        self
    }

    pub fn market(&self) -> &Arc<MarketRegistry> {
        &self.market
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn context(&self, name: ExchangeName) -> Result<AdapterContext> {
        let config = self.settings.exchange(name);
        let store: Arc<dyn KeyValueStore> = match (&self.store, &config.redis_server) {
            (Some(store), _) => store.clone(),
            (None, Some(server)) => {
                info!(exchange = %name, %server, db = config.redis_db, "connecting maker cache");
                Arc::new(RedisStore::connect(server, config.redis_db).await?)
            }
            (None, None) => Arc::new(self.memory.clone()),
        };
        Ok(AdapterContext {
            market: self.market.clone(),
            transport: self.transport.clone(),
            store,
        })
    }

    pub async fn kraken(&self) -> Result<Arc<Kraken>> {
        let kraken = self
            .kraken
            .get_or_try_init(|| async {
                let context = self.context(ExchangeName::Kraken).await?;
                let config = self.settings.exchange(ExchangeName::Kraken);
                Ok::<_, crate::error::Error>(Arc::new(Kraken::create(context, config).await))
            })
            .await?;
        Ok(kraken.clone())
    }

    pub async fn bitrue(&self) -> Result<Arc<Bitrue>> {
        let bitrue = self
            .bitrue
            .get_or_try_init(|| async {
                let context = self.context(ExchangeName::Bitrue).await?;
                let config = self.settings.exchange(ExchangeName::Bitrue);
                Ok::<_, crate::error::Error>(Arc::new(Bitrue::create(context, config).await))
            })
            .await?;
        Ok(bitrue.clone())
    }

    pub async fn coineal(&self) -> Result<Arc<Coineal>> {
        let coineal = self
            .coineal
            .get_or_try_init(|| async {
                let context = self.context(ExchangeName::Coineal).await?;
                let config = self.settings.exchange(ExchangeName::Coineal);
                Ok::<_, crate::error::Error>(Arc::new(Coineal::create(context, config).await))
            })
            .await?;
        Ok(coineal.clone())
    }

    pub async fn fcoin(&self) -> Result<Arc<Fcoin>> {
        let fcoin = self
            .fcoin
            .get_or_try_init(|| async {
                let context = self.context(ExchangeName::Fcoin).await?;
                let config = self.settings.exchange(ExchangeName::Fcoin);
                Ok::<_, crate::error::Error>(Arc::new(Fcoin::create(context, config).await))
            })
            .await?;
        Ok(fcoin.clone())
    }

    pub async fn get(&self, name: ExchangeName) -> Result<Arc<dyn Exchange>> {
        let exchange: Arc<dyn Exchange> = match name {
            ExchangeName::Kraken => self.kraken().await?,
            ExchangeName::Bitrue => self.bitrue().await?,
            ExchangeName::Coineal => self.coineal().await?,
            ExchangeName::Fcoin => self.fcoin().await?,
        };
        Ok(exchange)
    }
}
