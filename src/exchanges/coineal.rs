use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
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

const COINEAL_API_URL: &str = "https://exchange-open-api.coineal.com";
const TAKER_FEE: f64 = 0.0015;
const DEFAULT_TX_FEE: f64 = 0.001;

/// Coineal lists `-` for assets it has no code for.
const SYMBOL_EXCEPTIONS: &[(&str, &str)] = &[("-", "")];

pub struct Coineal {
    core: AdapterCore,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    /// Traded asset.
    base_coin: String,
    /// Quote currency.
    count_coin: String,
    #[serde(default)]
    amount_precision: Option<i32>,
    #[serde(default)]
    price_precision: Option<i32>,
}

/// Coineal numeric order state.
fn map_status(status: i64) -> OrderStatus {
    match status {
        0 | 1 => OrderStatus::New,
        2 => OrderStatus::Filled,
        3 => OrderStatus::Partial,
        4 => OrderStatus::Canceled,
        5 => OrderStatus::Canceling,
        _ => OrderStatus::Other,
    }
}

fn side_param(side: Side) -> &'static str {
    match side {
        Side::Buy => "BUY",
        Side::Sell => "SELL",
    }
}

impl Coineal {
    pub async fn create(context: AdapterContext, config: ExchangeConfig) -> Coineal {
        let core = AdapterCore::new(
            ExchangeName::Coineal,
            COINEAL_API_URL,
            SymbolTranslator::new(SYMBOL_EXCEPTIONS.iter().copied()),
            Signer::new(SigningScheme::SortedConcatMd5, COINEAL_API_URL),
            context,
            config,
        );
        let mut coineal = Coineal { core };
        let (coins, pairs) = match coineal.symbols().await {
            Ok(symbols) => coineal.discover(&symbols),
            Err(err) => {
                warn!(error = %err, "coineal market discovery failed");
                (Vec::new(), Vec::new())
            }
        };
        info!(coins = coins.len(), pairs = pairs.len(), "coineal adapter ready");
        coineal.core.set_discovered(coins, pairs);
        coineal
    }

    fn discover(&self, symbols: &[SymbolInfo]) -> (Vec<Arc<Coin>>, Vec<Arc<Pair>>) {
        let mut coins: Vec<Arc<Coin>> = Vec::new();
        let mut pairs = Vec::new();
        for symbol in symbols.iter().filter(|s| self.is_listed(s)) {
            let pair = self.core.pair(&symbol.count_coin, &symbol.base_coin);
            for coin in [&pair.base, &pair.target] {
                if !coins.contains(coin) {
                    coins.push(coin.clone());
                }
            }
            pairs.push(pair);
        }
        (coins, pairs)
    }

    fn is_listed(&self, symbol: &SymbolInfo) -> bool {
        let translator = self.core.translator();
        !translator.to_standard_code(&symbol.base_coin).is_empty()
            && !translator.to_standard_code(&symbol.count_coin).is_empty()
    }

    /// Unwraps `{code, msg, data}`; any code other than `"0"` is a rejection.
    fn data(&self, value: Value) -> Result<Value> {
        let ok = match &value["code"] {
            Value::String(code) => code == "0",
            Value::Number(code) => code.as_i64() == Some(0),
            _ => false,
        };
        if !ok {
            let msg = value["msg"].as_str().unwrap_or_default();
            return Err(self
                .core
                .rejected(format!("code {}: {msg}", value["code"])));
        }
        Ok(value["data"].clone())
    }

    async fn symbols(&self) -> Result<Vec<SymbolInfo>> {
        let value = self.core.public_get("/open/api/common/symbols", &[]).await?;
        let data = self.data(value)?;
        serde_json::from_value(data).map_err(|e| self.core.parse_error(e))
    }

    async fn signed(
        &self,
        method: Method,
        path: &str,
        params: Params,
        credentials: &Credentials,
    ) -> Result<Value> {
        let value = self.core.private(method, path, params, credentials).await?;
        self.data(value)
    }

    fn order_params(&self, order: &Order) -> Params {
        let mut params = Params::new();
        params.insert("order_id".into(), order.order_id.to_string());
        params.insert("symbol".into(), self.pair_code(&order.pair));
        params
    }
}

#[async_trait]
impl Exchange for Coineal {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn website(&self) -> &'static str {
        "https://www.coineal.com/"
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
        .to_lowercase()
    }

    async fn order_book(&self, pair: &Pair) -> Result<Maker> {
        let symbol = self.pair_code(pair);
        let value = self
            .core
            .public_get(
                "/open/api/market_dept",
                &[("symbol", symbol.as_str()), ("type", "step0")],
            )
            .await?;
        let data = self.data(value)?;
        let tick = &data["tick"];

        let bids = parse_levels(&tick["bids"], "coineal bids")?;
        let asks = parse_levels(&tick["asks"], "coineal asks")?;
        let timestamp = parse_amount(&tick["time"]).unwrap_or(0.0);
        Ok(self.core.finish_maker(Maker::new(bids, asks, timestamp)))
    }

    async fn update_all_balances_for(&self, credentials: &Credentials) {
        if !credentials.is_complete() {
            warn!("Coineal API key or secret is empty, skipping balance update");
            return;
        }
        let account = match self
            .signed(Method::GET, "/open/api/user/account", Params::new(), credentials)
            .await
        {
            Ok(account) => account,
            Err(err) => {
                warn!(error = %err, "coineal balance update failed");
                return;
            }
        };
        let Some(coin_list) = account["coin_list"].as_array() else {
            warn!(%account, "coineal account has no coin_list");
            return;
        };
        for entry in coin_list {
            let code = match &entry["coin"] {
                Value::String(code) => code.clone(),
                Value::Null => continue,
                other => other.to_string(),
            };
            if let Some(normal) = parse_amount(&entry["normal"]) {
                self.core.record_balance(&code, normal);
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
        params.insert("side".into(), side_param(side).into());
        params.insert("type".into(), "1".into());
        params.insert("volume".into(), quantity.to_string());
        params.insert("price".into(), rate.to_string());

        let data = self
            .signed(
                Method::POST,
                "/open/api/create_order",
                params,
                &self.core.credentials(),
            )
            .await?;
        let order_id = OrderId::from_json(&data["order_id"])
            .ok_or_else(|| self.core.parse_error(format!("create_order without order_id: {data}")))?;

        info!(%order_id, pair = %pair.name, %side, quantity, rate, "coineal limit order placed");
        Ok(Order::placed(order_id, pair.clone(), side, quantity, rate, data))
    }

    async fn order_status(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let data = self
            .signed(
                Method::GET,
                "/open/api/order_info",
                self.order_params(order),
                &self.core.credentials(),
            )
            .await?;
        let info = &data["order_info"];
        match OrderId::from_json(&info["id"]) {
            Some(id) if id == order.order_id => {}
            other => {
                return Err(self.core.parse_error(format!(
                    "order_info id {other:?} does not match {}",
                    order.order_id
                )))
            }
        }
        let status = info["status"]
            .as_i64()
            .ok_or_else(|| self.core.parse_error(format!("order_info without status: {info}")))?;
        order.status = map_status(status);
        Ok(())
    }

    async fn cancel_order(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        self.signed(
            Method::POST,
            "/open/api/cancel_order",
            self.order_params(order),
            &self.core.credentials(),
        )
        .await?;
        order.status = OrderStatus::Canceling;
        Ok(())
    }

    async fn update_pair_constraints(&self) -> Result<usize> {
        let symbols = self.symbols().await?;
        let constraints = symbols
            .iter()
            .filter(|s| self.is_listed(s))
            .map(|s| {
                let pair = self.core.pair(&s.count_coin, &s.base_coin);
                self.core.precision_constraint(&pair, s.amount_precision, s.price_precision)
            })
            .collect();
        self.core.store_pair_constraints(constraints).await
    }
}
