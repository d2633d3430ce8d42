use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{AdapterContext, AdapterCore, Exchange, ExchangeName};
use crate::error::Result;
use crate::model::{
    Coin, ConstraintFetchMethod, Maker, Order, OrderId, OrderStatus, Pair, PairConstraint, Side,
};
use crate::signing::{Credentials, Params, Signer, SigningScheme};
use crate::symbol::SymbolTranslator;
use crate::utils::balance::parse_amount;
use crate::utils::config::ExchangeConfig;
use crate::utils::depth::parse_levels;

const BITRUE_API_URL: &str = "https://www.bitrue.com";
const BITRUE_API_VERSION: &str = "v1";
const TAKER_FEE: f64 = 0.00098;
const DEFAULT_TX_FEE: f64 = 0.0005;

const SYMBOL_EXCEPTIONS: &[(&str, &str)] = &[("BCHSV", "BSV")];

pub struct Bitrue {
    core: AdapterCore,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolInfo {
    base_asset: String,
    quote_asset: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SymbolFilter {
    filter_type: String,
    #[serde(default)]
    min_price: Option<String>,
    #[serde(default)]
    min_qty: Option<String>,
}

impl SymbolInfo {
    fn filter_value(&self, filter_type: &str, pick: fn(&SymbolFilter) -> Option<&String>) -> Option<f64> {
        self.filters
            .iter()
            .find(|f| f.filter_type == filter_type)
            .and_then(pick)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| *v > 0.0)
    }

    fn constraint(&self, pair: &Pair) -> PairConstraint {
        let fallback = PairConstraint::fallback(&pair.name);
        PairConstraint {
            pair: pair.name.clone(),
            lot_size: self
                .filter_value("LOT_SIZE", |f| f.min_qty.as_ref())
                .unwrap_or(fallback.lot_size),
            tick_size: self
                .filter_value("PRICE_FILTER", |f| f.min_price.as_ref())
                .unwrap_or(fallback.tick_size),
        }
    }
}

struct BitrueUtils;

impl BitrueUtils {
    fn api_path(method: &str) -> String {
        format!("/api/{BITRUE_API_VERSION}/{method}")
    }

    fn side(side: Side) -> &'static str {
        match side {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

fn map_status(status: &str) -> OrderStatus {
    match status {
        "NEW" => OrderStatus::New,
        "PARTIALLY_FILLED" => OrderStatus::Partial,
        "FILLED" => OrderStatus::Filled,
        "REJECTED" => OrderStatus::Rejected,
        "PENDING_CANCEL" => OrderStatus::Canceling,
        "CANCELED" => OrderStatus::Canceled,
        "EXPIRED" => OrderStatus::Expired,
        _ => OrderStatus::Other,
    }
}

impl Bitrue {
    pub async fn create(context: AdapterContext, config: ExchangeConfig) -> Bitrue {
        let core = AdapterCore::new(
            ExchangeName::Bitrue,
            BITRUE_API_URL,
            SymbolTranslator::new(SYMBOL_EXCEPTIONS.iter().copied()),
            Signer::new(SigningScheme::SortedQuerySha256, BITRUE_API_URL),
            context,
            config,
        );
        let mut bitrue = Bitrue { core };
        let (coins, pairs) = match bitrue.exchange_info().await {
            Ok(exchange_info) => bitrue.discover(&exchange_info),
            Err(err) => {
                warn!(error = %err, "bitrue market discovery failed");
                (Vec::new(), Vec::new())
            }
        };
        info!(coins = coins.len(), pairs = pairs.len(), "bitrue adapter ready");
        bitrue.core.set_discovered(coins, pairs);
        bitrue
    }

    fn discover(&self, exchange_info: &ExchangeInfo) -> (Vec<Arc<Coin>>, Vec<Arc<Pair>>) {
        let mut coins: Vec<Arc<Coin>> = Vec::new();
        let mut pairs = Vec::new();
        for symbol in &exchange_info.symbols {
            let pair = self.core.pair(&symbol.quote_asset, &symbol.base_asset);
            for coin in [&pair.base, &pair.target] {
                if !coins.contains(coin) {
                    coins.push(coin.clone());
                }
            }
            pairs.push(pair);
        }
        (coins, pairs)
    }

    async fn exchange_info(&self) -> Result<ExchangeInfo> {
        let value = self
            .core
            .public_get(&BitrueUtils::api_path("exchangeInfo"), &[])
            .await?;
        let value = self.check(value)?;
        serde_json::from_value(value).map_err(|e| self.core.parse_error(e))
    }

    /// Error bodies are `{"code": <non-zero>, "msg": "..."}`.
    fn check(&self, value: Value) -> Result<Value> {
        let code = value.get("code").and_then(Value::as_i64);
        match (code, value.get("msg").and_then(Value::as_str)) {
            (Some(code), Some(msg)) if code != 0 && code != 200 => {
                Err(self.core.rejected(format!("{code}: {msg}")))
            }
            _ => Ok(value),
        }
    }

    async fn signed(&self, method: Method, endpoint: &str, params: Params) -> Result<Value> {
        let value = self
            .core
            .private(
                method,
                &BitrueUtils::api_path(endpoint),
                params,
                &self.core.credentials(),
            )
            .await?;
        self.check(value)
    }

    fn order_params(&self, order: &Order) -> Params {
        let mut params = Params::new();
        params.insert("symbol".into(), self.pair_code(&order.pair));
        params.insert("orderId".into(), order.order_id.to_string());
        params
    }

    fn same_order(&self, value: &Value, order: &Order) -> Result<()> {
        match OrderId::from_json(&value["orderId"]) {
            Some(id) if id == order.order_id => Ok(()),
            other => Err(self.core.parse_error(format!(
                "response order id {other:?} does not match {}",
                order.order_id
            ))),
        }
    }
}

#[async_trait]
impl Exchange for Bitrue {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn website(&self) -> &'static str {
        "https://www.bitrue.com/"
    }

    fn fee(&self, _pair: &Pair) -> f64 {
        TAKER_FEE
    }

    fn constraint_fetch_method(&self, _pair: &Pair) -> ConstraintFetchMethod {
        ConstraintFetchMethod {
            lot_size: true,
            tick_size: true,
            ..Default::default()
        }
    }

    fn default_tx_fee(&self) -> f64 {
        DEFAULT_TX_FEE
    }

    fn pair_code(&self, pair: &Pair) -> String {
        let translator = self.core.translator();
        format!(
            "{}{}",
            translator.to_exchange_code(&pair.target.code),
            translator.to_exchange_code(&pair.base.code)
        )
        .to_uppercase()
    }

    async fn order_book(&self, pair: &Pair) -> Result<Maker> {
        let symbol = self.pair_code(pair);
        let value = self
            .core
            .public_get(
                &BitrueUtils::api_path("depth"),
                &[("symbol", symbol.as_str()), ("limit", "0")],
            )
            .await?;
        let book = self.check(value)?;

        let bids = parse_levels(&book["bids"], "bitrue bids")?;
        let asks = parse_levels(&book["asks"], "bitrue asks")?;
        Ok(self.core.finish_maker(Maker::new(bids, asks, 0.0)))
    }

    async fn update_all_balances_for(&self, credentials: &Credentials) {
        if !credentials.is_complete() {
            warn!("Bitrue API key or secret is empty, skipping balance update");
            return;
        }
        let account = match self
            .core
            .private(
                Method::GET,
                &BitrueUtils::api_path("account"),
                Params::new(),
                credentials,
            )
            .await
            .and_then(|v| self.check(v))
        {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "bitrue balance update failed");
                return;
            }
        };
        let Some(balances) = account["balances"].as_array() else {
            warn!(%account, "bitrue account has no balances");
            return;
        };
        for balance in balances {
            if let (Some(asset), Some(free)) =
                (balance["asset"].as_str(), parse_amount(&balance["free"]))
            {
                self.core.record_balance(asset, free);
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
        params.insert("symbol".into(), self.pair_code(pair));
        params.insert("side".into(), BitrueUtils::side(side).into());
        params.insert("type".into(), "LIMIT".into());
        params.insert("price".into(), rate.to_string());
        params.insert("quantity".into(), quantity.to_string());

        let raw = self.signed(Method::POST, "order", params).await?;
        let order_id = OrderId::from_json(&raw["orderId"])
            .ok_or_else(|| self.core.rejected(raw.to_string()))?;

        info!(%order_id, pair = %pair.name, %side, quantity, rate, "bitrue limit order placed");
        Ok(Order::placed(order_id, pair.clone(), side, quantity, rate, raw))
    }

    async fn order_status(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let value = self
            .signed(Method::GET, "order", self.order_params(order))
            .await?;
        self.same_order(&value, order)?;

        let status = value["status"]
            .as_str()
            .ok_or_else(|| self.core.parse_error(format!("order without status: {value}")))?;
        order.status = map_status(status);
        Ok(())
    }

    async fn cancel_order(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let value = self
            .signed(Method::DELETE, "order", self.order_params(order))
            .await?;
        self.same_order(&value, order)?;
        order.status = OrderStatus::Canceling;
        Ok(())
    }

    async fn update_pair_constraints(&self) -> Result<usize> {
        let exchange_info = self.exchange_info().await?;
        let constraints = exchange_info
            .symbols
            .iter()
            .map(|symbol| {
                let pair = self.core.pair(&symbol.quote_asset, &symbol.base_asset);
                symbol.constraint(&pair)
            })
            .collect();
        self.core.store_pair_constraints(constraints).await
    }
}
