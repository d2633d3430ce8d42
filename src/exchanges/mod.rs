//! The uniform exchange contract and the skeleton shared by every adapter.
pub mod bitrue;
pub mod coineal;
pub mod fcoin;
pub mod kraken;
pub mod registry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{KeyValueStore, MarketCache};
use crate::error::{Error, Result};
use crate::model::{
    Coin, ConstraintFetchMethod, Maker, MarketRegistry, Order, Pair, PairConstraint, Side,
};
use crate::signing::{Credentials, Params, Signer};
use crate::symbol::SymbolTranslator;
use crate::transport::{HttpRequest, Transport};
use crate::utils::balance::BalanceBook;
use crate::utils::config::ExchangeConfig;

pub use bitrue::Bitrue;
pub use coineal::Coineal;
pub use fcoin::Fcoin;
pub use kraken::Kraken;
pub use registry::AdapterRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeName {
    Kraken,
    Bitrue,
    Coineal,
    Fcoin,
}

impl ExchangeName {
    pub const ALL: [ExchangeName; 4] = [
        ExchangeName::Kraken,
        ExchangeName::Bitrue,
        ExchangeName::Coineal,
        ExchangeName::Fcoin,
    ];

    /// Upper-case identifier used in cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeName::Kraken => "KRAKEN",
            ExchangeName::Bitrue => "BITRUE",
            ExchangeName::Coineal => "COINEAL",
            ExchangeName::Fcoin => "FCOIN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ExchangeName::Kraken => "Kraken",
            ExchangeName::Bitrue => "Bitrue",
            ExchangeName::Coineal => "Coineal",
            ExchangeName::Fcoin => "Fcoin",
        }
    }
}

impl fmt::Display for ExchangeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExchangeName {
    type Err = Error;

    fn from_str(s: &str) -> Result<ExchangeName> {
        ExchangeName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown exchange {s}")))
    }
}

/// Collaborators an adapter is built from.
#[derive(Clone)]
pub struct AdapterContext {
    pub market: Arc<MarketRegistry>,
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn KeyValueStore>,
}

/// State and plumbing every adapter carries.
pub struct AdapterCore {
    name: ExchangeName,
    base_url: String,
    translator: SymbolTranslator,
    signer: Signer,
    market: Arc<MarketRegistry>,
    transport: Arc<dyn Transport>,
    cache: MarketCache,
    balances: BalanceBook,
    config: ExchangeConfig,
    coins: Vec<Arc<Coin>>,
    pairs: Vec<Arc<Pair>>,
}

impl AdapterCore {
    pub fn new(
        name: ExchangeName,
        base_url: &str,
        translator: SymbolTranslator,
        signer: Signer,
        context: AdapterContext,
        config: ExchangeConfig,
    ) -> AdapterCore {
        AdapterCore {
            name,
            base_url: base_url.to_string(),
            translator,
            signer,
            market: context.market,
            transport: context.transport,
            cache: MarketCache::new(name.as_str(), context.store),
            balances: BalanceBook::new(name.as_str()),
            config,
            coins: Vec::new(),
            pairs: Vec::new(),
        }
    }

    pub fn name(&self) -> ExchangeName {
        self.name
    }

    pub fn translator(&self) -> &SymbolTranslator {
        &self.translator
    }

    pub fn market(&self) -> &MarketRegistry {
        &self.market
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    pub fn balances(&self) -> &BalanceBook {
        &self.balances
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn credentials(&self) -> Credentials {
        self.config.credentials()
    }

    /// Registers a coin from its exchange code.
    pub fn coin(&self, exchange_code: &str) -> Arc<Coin> {
        self.market
            .get_or_create_coin(&self.translator.to_standard_code(exchange_code))
    }

    /// Looks up an already registered coin from its exchange code.
    pub fn known_coin(&self, exchange_code: &str) -> Option<Arc<Coin>> {
        self.market
            .coin(&self.translator.to_standard_code(exchange_code))
    }

    /// Records a balance reported under an exchange code. Unknown coins are
    /// skipped; returns whether the balance was stored.
    pub fn record_balance(&self, exchange_code: &str, amount: f64) -> bool {
        match self.known_coin(exchange_code) {
            Some(coin) => {
                self.balances.set(&coin, amount);
                true
            }
            None => false,
        }
    }

    /// Registers a pair from exchange codes (`base` is the quote currency).
    pub fn pair(&self, base_code: &str, target_code: &str) -> Arc<Pair> {
        let base = self.coin(base_code);
        let target = self.coin(target_code);
        self.market.get_or_create_pair(&base, &target)
    }

    pub(crate) fn set_discovered(&mut self, coins: Vec<Arc<Coin>>, pairs: Vec<Arc<Pair>>) {
        debug!(
            exchange = %self.name,
            coins = coins.len(),
            pairs = pairs.len(),
            "discovery finished"
        );
        self.coins = coins;
        self.pairs = pairs;
    }

    pub async fn public_get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let request = if params.is_empty() {
            HttpRequest::get(url)
        } else {
            HttpRequest::get_with_params(&url, params)?
        };
        let body = self.transport.send(request).await?;
        self.decode(path, &body)
    }

    pub async fn private(
        &self,
        method: Method,
        path: &str,
        params: Params,
        credentials: &Credentials,
    ) -> Result<Value> {
        credentials.require(self.name.display_name())?;
        let request = self.signer.sign(method, path, params, credentials)?;
        let body = self.transport.send(request).await?;
        self.decode(path, &body)
    }

    fn decode(&self, path: &str, body: &str) -> Result<Value> {
        serde_json::from_str(body).map_err(|e| {
            Error::parse(
                format!("{} {path}", self.name.display_name()),
                format!("{e}: {}", truncate(body)),
            )
        })
    }

    pub fn rejected(&self, message: impl Into<String>) -> Error {
        Error::rejected(self.name.display_name(), message)
    }

    pub fn parse_error(&self, detail: impl fmt::Display) -> Error {
        Error::parse(self.name.display_name(), detail)
    }

    /// Stamps a freshly parsed book with the local clock and worker address.
    pub fn finish_maker(&self, mut maker: Maker) -> Maker {
        if maker.timestamp == 0.0 {
            maker.timestamp = chrono::Utc::now().timestamp_millis() as f64;
        }
        if let Some(ip) = &self.config.worker_ip {
            maker.worker_ip = ip.clone();
        }
        maker
    }

    fn check_order(&self, credentials: &Credentials, quantity: f64, rate: f64) -> Result<()> {
        credentials.require(self.name.display_name())?;
        if !(quantity.is_finite() && quantity > 0.0) || !(rate.is_finite() && rate > 0.0) {
            return Err(Error::InvalidInput(format!(
                "quantity and rate must be positive, got quantity={quantity} rate={rate}"
            )));
        }
        Ok(())
    }

    /// Credentials first, then a positive amount and a destination.
    pub fn check_withdraw(&self, quantity: f64, addr: &str) -> Result<()> {
        self.credentials().require(self.name.display_name())?;
        if !(quantity.is_finite() && quantity > 0.0) {
            return Err(Error::InvalidInput(format!(
                "withdraw quantity must be positive, got {quantity}"
            )));
        }
        if addr.is_empty() {
            return Err(Error::InvalidInput("withdraw address is empty".into()));
        }
        Ok(())
    }

    fn check_order_id(&self, order: &Order) -> Result<()> {
        self.credentials().require(self.name.display_name())?;
        if order.order_id.is_empty() {
            return Err(Error::InvalidInput("order has no exchange order id".into()));
        }
        Ok(())
    }

    /// Cached pair constraint, or the minimum sentinel with the cause logged.
    pub async fn pair_constraint(&self, pair: &Pair) -> PairConstraint {
        match self.cache.get_pair_constraint(pair).await {
            Ok(constraint) => constraint,
            Err(err) => {
                warn!(exchange = %self.name, pair = %pair.name, error = %err, "no usable pair constraint, using minimum");
                PairConstraint::fallback(&pair.name)
            }
        }
    }

    /// Limits from published decimal precisions. Unpublished sides keep the
    /// minimum sentinel instead of `10^0`.
    pub fn precision_constraint(
        &self,
        pair: &Pair,
        lot_decimals: Option<i32>,
        tick_decimals: Option<i32>,
    ) -> PairConstraint {
        if lot_decimals.is_none() || tick_decimals.is_none() {
            warn!(
                exchange = %self.name,
                pair = %pair.name,
                lot_published = lot_decimals.is_some(),
                tick_published = tick_decimals.is_some(),
                "symbol has no precision, using minimum"
            );
        }
        PairConstraint::from_precision(&pair.name, lot_decimals, tick_decimals)
    }

    pub async fn store_pair_constraints(&self, constraints: Vec<PairConstraint>) -> Result<usize> {
        let mut written = 0;
        for constraint in constraints {
            let Some(pair) = self.market.pair_by_key(&constraint.pair) else {
                continue;
            };
            self.cache.put_pair_constraint(&pair, &constraint).await?;
            written += 1;
        }
        debug!(exchange = %self.name, written, "pair constraints stored");
        Ok(written)
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(256) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// The polymorphic exchange contract.
///
/// Exchange-specific behaviour is the required methods; everything built on
/// the shared cache, balance book and constraint fallback is provided.
#[async_trait]
pub trait Exchange: Send + Sync {
    fn core(&self) -> &AdapterCore;

    fn website(&self) -> &'static str;

    /// Taker fee rate.
    fn fee(&self, pair: &Pair) -> f64;

    fn constraint_fetch_method(&self, pair: &Pair) -> ConstraintFetchMethod;

    /// Withdrawal fee assumed when no coin constraint is cached.
    fn default_tx_fee(&self) -> f64;

    /// The exchange's symbol for `pair`.
    fn pair_code(&self, pair: &Pair) -> String;

    /// Fetches a fresh order book. Never returns a partial book.
    async fn order_book(&self, pair: &Pair) -> Result<Maker>;

    /// Refreshes the balance book with `credentials`. Best-effort: failures
    /// are logged, never returned.
    async fn update_all_balances_for(&self, credentials: &Credentials);

    async fn place_limit_order(
        &self,
        pair: &Arc<Pair>,
        side: Side,
        quantity: f64,
        rate: f64,
    ) -> Result<Order>;

    /// Maps the exchange's current state of `order` onto `order.status`.
    async fn order_status(&self, order: &mut Order) -> Result<()>;

    /// Requests cancellation; on acknowledgement the order is `Canceling`.
    async fn cancel_order(&self, order: &mut Order) -> Result<()>;

    /// Pulls lot/tick sizes from the exchange into the cache and returns how
    /// many pair constraints were written.
    async fn update_pair_constraints(&self) -> Result<usize>;

    /// Sends `quantity` of `coin` to `addr` (with `tag` where the chain needs
    /// one). Adapters without a withdrawal endpoint answer `Unsupported`.
    async fn withdraw(
        &self,
        _coin: &Coin,
        _quantity: f64,
        _addr: &str,
        _tag: &str,
    ) -> Result<()> {
        Err(Error::Unsupported {
            exchange: self.name().display_name().to_string(),
            operation: "withdraw",
        })
    }

    fn name(&self) -> ExchangeName {
        self.core().name()
    }

    fn coins(&self) -> &[Arc<Coin>] {
        &self.core().coins
    }

    fn pairs(&self) -> &[Arc<Pair>] {
        &self.core().pairs
    }

    async fn update_all_balances(&self) {
        let credentials = self.core().credentials();
        self.update_all_balances_for(&credentials).await
    }

    async fn limit_buy(&self, pair: &Arc<Pair>, quantity: f64, rate: f64) -> Result<Order> {
        self.core()
            .check_order(&self.core().credentials(), quantity, rate)?;
        self.place_limit_order(pair, Side::Buy, quantity, rate).await
    }

    async fn limit_sell(&self, pair: &Arc<Pair>, quantity: f64, rate: f64) -> Result<Order> {
        self.core()
            .check_order(&self.core().credentials(), quantity, rate)?;
        self.place_limit_order(pair, Side::Sell, quantity, rate).await
    }

    fn balance(&self, coin: &Coin) -> f64 {
        self.core().balances().get(coin)
    }

    async fn update_maker(&self, pair: &Pair, maker: &Maker) -> Result<()> {
        self.core().cache().put_snapshot(pair, maker).await
    }

    async fn maker(&self, pair: &Pair) -> Result<Maker> {
        self.core().cache().get_snapshot(pair).await
    }

    /// True when a cached snapshot with bids exists for `pair`.
    async fn has_pair(&self, pair: &Pair) -> bool {
        matches!(self.maker(pair).await, Ok(m) if !m.bids.is_empty())
    }

    async fn lot_size(&self, pair: &Pair) -> f64 {
        let constraint = self.core().pair_constraint(pair).await;
        if constraint.lot_size > 0.0 {
            constraint.lot_size
        } else {
            warn!(exchange = %self.name(), pair = %pair.name, lot_size = constraint.lot_size, "cached lot size is not positive, using minimum");
            PairConstraint::fallback(&pair.name).lot_size
        }
    }

    async fn price_filter(&self, pair: &Pair) -> f64 {
        let constraint = self.core().pair_constraint(pair).await;
        if constraint.tick_size > 0.0 {
            constraint.tick_size
        } else {
            warn!(exchange = %self.name(), pair = %pair.name, tick_size = constraint.tick_size, "cached tick size is not positive, using minimum");
            PairConstraint::fallback(&pair.name).tick_size
        }
    }

    async fn tx_fee(&self, coin: &Coin) -> f64 {
        match self.core().cache().get_coin_constraint(coin).await {
            Ok(constraint) => constraint.tx_fee,
            Err(err) => {
                debug!(exchange = %self.name(), coin = %coin.code, error = %err, "using default withdrawal fee");
                self.default_tx_fee()
            }
        }
    }

    async fn confirmation(&self, coin: &Coin) -> u32 {
        self.core()
            .cache()
            .get_coin_constraint(coin)
            .await
            .map(|c| c.confirmation)
            .unwrap_or(0)
    }

    async fn can_withdraw(&self, coin: &Coin) -> bool {
        match self.core().cache().get_coin_constraint(coin).await {
            Ok(constraint) => constraint.withdraw,
            Err(_) => self
                .core()
                .config()
                .wallet_status(&coin.code)
                .is_some_and(|w| w.withdraw),
        }
    }

    async fn can_deposit(&self, coin: &Coin) -> bool {
        match self.core().cache().get_coin_constraint(coin).await {
            Ok(constraint) => constraint.deposit,
            Err(_) => self
                .core()
                .config()
                .wallet_status(&coin.code)
                .is_some_and(|w| w.deposit),
        }
    }
}
