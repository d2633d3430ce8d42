use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{AdapterContext, AdapterCore, Exchange, ExchangeName};
use crate::error::Result;
use crate::model::{Coin, ConstraintFetchMethod, Maker, Order, OrderId, OrderStatus, Pair, Side};
use crate::signing::{Credentials, Params, Signer, SigningScheme};
use crate::symbol::SymbolTranslator;
use crate::utils::balance::parse_amount;
use crate::utils::config::ExchangeConfig;
use crate::utils::depth::parse_levels;

const KRAKEN_API_URL: &str = "https://api.kraken.com";
const KRAKEN_API_VERSION: &str = "0";
const TAKER_FEE: f64 = 0.0026;
const DEFAULT_TX_FEE: f64 = 0.0005;

/// Kraken asset code -> standard code.
const SYMBOL_EXCEPTIONS: &[(&str, &str)] = &[
    ("XXBT", "BTC"),
    ("XDAO", "DAO"),
    ("XETC", "ETC"),
    ("XETH", "ETH"),
    ("XICN", "ICN"),
    ("XLTC", "LTC"),
    ("XMLN", "MLN"),
    ("XNMC", "NMC"),
    ("XREP", "REP"),
    ("XXDG", "XDG"),
    ("XXLM", "XLM"),
    ("XXMR", "XMR"),
    ("XXRP", "XRP"),
    ("XXVN", "XVN"),
    ("XZEC", "ZEC"),
    ("ZCAD", "CAD"),
    ("ZEUR", "EUR"),
    ("ZGBP", "GBP"),
    ("ZJPY", "JPY"),
    ("ZKRW", "KRW"),
    ("ZUSD", "USD"),
];

pub struct Kraken {
    core: AdapterCore,
}

#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<Value>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct AssetPair {
    base: String,
    quote: String,
    #[serde(default)]
    lot_decimals: Option<i32>,
    #[serde(default)]
    pair_decimals: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct AddOrderResult {
    #[serde(default)]
    txid: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OrderInfo {
    status: String,
    #[serde(default)]
    vol_exec: Value,
}

#[derive(Debug, Deserialize)]
struct CancelResult {
    #[serde(default)]
    count: u64,
}

struct KrakenUtils;

impl KrakenUtils {
    fn is_method_public(method: &str) -> bool {
        ["Time", "Assets", "AssetPairs", "Ticker", "Depth"].contains(&method)
    }

    fn is_method_private(method: &str) -> bool {
        ["Balance", "QueryOrders", "AddOrder", "CancelOrder", "Withdraw"].contains(&method)
    }

    /// `/0/public/Depth`, `/0/private/AddOrder`, ...
    fn api_path(method: &str) -> String {
        let method_type = if KrakenUtils::is_method_public(method) {
            "public"
        } else if KrakenUtils::is_method_private(method) {
            "private"
        } else {
            "invalid"
        };
        format!("/{KRAKEN_API_VERSION}/{method_type}/{method}")
    }
}

fn map_status(info: &OrderInfo) -> OrderStatus {
    match info.status.as_str() {
        "pending" => OrderStatus::New,
        "open" => {
            if parse_amount(&info.vol_exec).is_some_and(|v| v > 0.0) {
                OrderStatus::Partial
            } else {
                OrderStatus::New
            }
        }
        "closed" => OrderStatus::Filled,
        "canceled" => OrderStatus::Canceled,
        "expired" => OrderStatus::Expired,
        _ => OrderStatus::Other,
    }
}

impl Kraken {
    pub async fn create(context: AdapterContext, config: ExchangeConfig) -> Kraken {
        let core = AdapterCore::new(
            ExchangeName::Kraken,
            KRAKEN_API_URL,
            SymbolTranslator::new(SYMBOL_EXCEPTIONS.iter().copied()),
            Signer::new(SigningScheme::PathBodySha512, KRAKEN_API_URL),
            context,
            config,
        );
        let mut kraken = Kraken { core };
        let coins = kraken.init_coins().await;
        let pairs = kraken.init_pairs().await;
        info!(coins = coins.len(), pairs = pairs.len(), "kraken adapter ready");
        kraken.core.set_discovered(coins, pairs);
        kraken
    }

    async fn public<T: DeserializeOwned>(&self, method: &str, params: &[(&str, &str)]) -> Result<T> {
        let value = self
            .core
            .public_get(&KrakenUtils::api_path(method), params)
            .await?;
        self.result(value)
    }

    async fn private<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Params,
        credentials: &Credentials,
    ) -> Result<T> {
        let value = self
            .core
            .private(Method::POST, &KrakenUtils::api_path(method), params, credentials)
            .await?;
        self.result(value)
    }

    /// Unwraps the `{error, result}` envelope.
    fn result<T: DeserializeOwned>(&self, value: Value) -> Result<T> {
        let response: KrakenResponse =
            serde_json::from_value(value).map_err(|e| self.core.parse_error(e))?;
        if !response.error.is_empty() {
            let messages: Vec<String> = response
                .error
                .iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect();
            return Err(self.core.rejected(messages.join("; ")));
        }
        serde_json::from_value(response.result).map_err(|e| self.core.parse_error(e))
    }

    async fn init_coins(&self) -> Vec<Arc<Coin>> {
        match self.public::<HashMap<String, Value>>("Assets", &[]).await {
            Ok(assets) => assets.keys().map(|code| self.core.coin(code)).collect(),
            Err(err) => {
                warn!(error = %err, "kraken asset discovery failed");
                Vec::new()
            }
        }
    }

    async fn asset_pairs(&self) -> Result<HashMap<String, AssetPair>> {
        let pairs: HashMap<String, AssetPair> = self.public("AssetPairs", &[]).await?;
        // dark pool books share their asset pair with the lit one
        Ok(pairs
            .into_iter()
            .filter(|(name, _)| !name.ends_with(".d"))
            .collect())
    }

    async fn init_pairs(&self) -> Vec<Arc<Pair>> {
        match self.asset_pairs().await {
            Ok(pairs) => pairs
                .values()
                .map(|p| self.core.pair(&p.quote, &p.base))
                .collect(),
            Err(err) => {
                warn!(error = %err, "kraken pair discovery failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Exchange for Kraken {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn website(&self) -> &'static str {
        "https://www.kraken.com/"
    }

    fn fee(&self, _pair: &Pair) -> f64 {
        TAKER_FEE
    }

    fn constraint_fetch_method(&self, _pair: &Pair) -> ConstraintFetchMethod {
        ConstraintFetchMethod {
            fee: false,
            lot_size: true,
            tick_size: true,
            ..Default::default()
        }
    }

    fn default_tx_fee(&self) -> f64 {
        DEFAULT_TX_FEE
    }

    fn pair_code(&self, pair: &Pair) -> String {
        let base = if pair.base.code == "BTC" {
            "XBT".to_string()
        } else {
            pair.base.code.clone()
        };
        format!("{}{}", pair.target.code, base)
    }

    async fn order_book(&self, pair: &Pair) -> Result<Maker> {
        let code = self.pair_code(pair);
        let books: HashMap<String, Value> = self.public("Depth", &[("pair", code.as_str())]).await?;
        let book = books
            .values()
            .next()
            .ok_or_else(|| self.core.parse_error(format!("empty depth result for {code}")))?;

        let bids = parse_levels(&book["bids"], "kraken bids")?;
        let asks = parse_levels(&book["asks"], "kraken asks")?;
        Ok(self.core.finish_maker(Maker::new(bids, asks, 0.0)))
    }

    async fn update_all_balances_for(&self, credentials: &Credentials) {
        if !credentials.is_complete() {
            warn!("Kraken API key or secret is empty, skipping balance update");
            return;
        }
        let balances: HashMap<String, Value> =
            match self.private("Balance", Params::new(), credentials).await {
                Ok(balances) => balances,
                Err(err) => {
                    warn!(error = %err, "kraken balance update failed");
                    return;
                }
            };
        for (code, amount) in &balances {
            if let Some(amount) = parse_amount(amount) {
                self.core.record_balance(code, amount);
            }
        }
    }

    async fn place_limit_order(
        &self,
        pair: &Arc<Pair>,
        side: Side,
        quantity: f64,
        rate: f64,
    ) -> Result<Order> {
        let mut params = Params::new();
        params.insert("pair".into(), self.pair_code(pair));
        params.insert(
            "type".into(),
            match side {
                Side::Buy => "buy".into(),
                Side::Sell => "sell".into(),
            },
        );
        params.insert("ordertype".into(), "limit".into());
        params.insert("price".into(), rate.to_string());
        params.insert("volume".into(), quantity.to_string());

        let raw: Value = self
            .private("AddOrder", params, &self.core.credentials())
            .await?;
        let placed: AddOrderResult =
            serde_json::from_value(raw.clone()).map_err(|e| self.core.parse_error(e))?;
        let txid = placed
            .txid
            .into_iter()
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| self.core.parse_error(format!("AddOrder returned no txid: {raw}")))?;

        info!(%txid, pair = %pair.name, %side, quantity, rate, "kraken limit order placed");
        Ok(Order::placed(OrderId::new(txid), pair.clone(), side, quantity, rate, raw))
    }

    async fn order_status(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let mut params = Params::new();
        params.insert("txid".into(), order.order_id.to_string());

        let orders: HashMap<String, OrderInfo> = self
            .private("QueryOrders", params, &self.core.credentials())
            .await?;
        let info = orders.get(order.order_id.as_str()).ok_or_else(|| {
            self.core
                .parse_error(format!("QueryOrders has no entry for {}", order.order_id))
        })?;
        order.status = map_status(info);
        Ok(())
    }

    async fn cancel_order(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let mut params = Params::new();
        params.insert("txid".into(), order.order_id.to_string());

        let cancel: CancelResult = self
            .private("CancelOrder", params, &self.core.credentials())
            .await?;
        if cancel.count == 0 {
            return Err(self
                .core
                .rejected(format!("no order canceled for {}", order.order_id)));
        }
        order.status = OrderStatus::Canceling;
        Ok(())
    }

    /// `addr` is the withdrawal key name set up on the Kraken account. The
    /// first withdrawal to a key still needs e-mail confirmation.
    async fn withdraw(&self, coin: &Coin, quantity: f64, addr: &str, _tag: &str) -> Result<()> {
        self.core.check_withdraw(quantity, addr)?;
        let mut params = Params::new();
        params.insert("key".into(), addr.to_string());
        params.insert(
            "asset".into(),
            self.core.translator().to_exchange_code(&coin.code),
        );
        params.insert("amount".into(), quantity.to_string());

        let result: Value = self
            .private("Withdraw", params, &self.core.credentials())
            .await?;
        info!(coin = %coin.code, quantity, refid = %result["refid"], "kraken withdrawal requested");
        Ok(())
    }

    async fn update_pair_constraints(&self) -> Result<usize> {
        let constraints = self
            .asset_pairs()
            .await?
            .values()
            .map(|p| {
                let pair = self.core.pair(&p.quote, &p.base);
                self.core.precision_constraint(&pair, p.lot_decimals, p.pair_decimals)
            })
            .collect();
        self.core.store_pair_constraints(constraints).await
    }
}
