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
use crate::utils::depth::parse_flat_levels;

const FCOIN_API_URL: &str = "https://api.fcoin.com/v2/";
const TAKER_FEE: f64 = 0.002;
const DEFAULT_TX_FEE: f64 = 0.001;

pub struct Fcoin {
    core: AdapterCore,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    base_currency: String,
    quote_currency: String,
    #[serde(default)]
    amount_decimal: Option<i32>,
    #[serde(default)]
    price_decimal: Option<i32>,
}

fn map_state(state: &str) -> OrderStatus {
    match state {
        "submitted" => OrderStatus::New,
        "partial_filled" => OrderStatus::Partial,
        "filled" => OrderStatus::Filled,
        "pending_cancel" => OrderStatus::Canceling,
        "canceled" | "partial_canceled" => OrderStatus::Canceled,
        _ => OrderStatus::Other,
    }
}

impl Fcoin {
    pub async fn create(context: AdapterContext, config: ExchangeConfig) -> Fcoin {
        let core = AdapterCore::new(
            ExchangeName::Fcoin,
            FCOIN_API_URL,
            SymbolTranslator::default(),
            Signer::new(SigningScheme::PathTimestampSha1, FCOIN_API_URL),
            context,
            config,
        );
        let mut fcoin = Fcoin { core };

        let coins: Vec<Arc<Coin>> = match fcoin.currencies().await {
            Ok(codes) => codes.iter().map(|code| fcoin.core.coin(code)).collect(),
            Err(err) => {
                warn!(error = %err, "fcoin currency discovery failed");
                Vec::new()
            }
        };
        let pairs: Vec<Arc<Pair>> = match fcoin.symbols().await {
            Ok(symbols) => symbols.iter().map(|s| fcoin.symbol_pair(s)).collect(),
            Err(err) => {
                warn!(error = %err, "fcoin symbol discovery failed");
                Vec::new()
            }
        };
        info!(coins = coins.len(), pairs = pairs.len(), "fcoin adapter ready");
        fcoin.core.set_discovered(coins, pairs);
        fcoin
    }

    fn symbol_pair(&self, symbol: &SymbolInfo) -> Arc<Pair> {
        self.core
            .pair(&symbol.quote_currency, &symbol.base_currency)
    }

    /// Unwraps `{status, data, msg}`; a non-zero status is a rejection.
    fn data(&self, value: Value) -> Result<Value> {
        match value["status"].as_i64() {
            Some(0) => Ok(value["data"].clone()),
            status => {
                let msg = value["msg"].as_str().unwrap_or_default();
                Err(self.core.rejected(format!(
                    "status {}: {msg}",
                    status.map(|s| s.to_string()).unwrap_or_else(|| "missing".into())
                )))
            }
        }
    }

    async fn currencies(&self) -> Result<Vec<String>> {
        let value = self.core.public_get("public/currencies", &[]).await?;
        serde_json::from_value(self.data(value)?).map_err(|e| self.core.parse_error(e))
    }

    async fn symbols(&self) -> Result<Vec<SymbolInfo>> {
        let value = self.core.public_get("public/symbols", &[]).await?;
        serde_json::from_value(self.data(value)?).map_err(|e| self.core.parse_error(e))
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
}

#[async_trait]
impl Exchange for Fcoin {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn website(&self) -> &'static str {
        "https://www.fcoin.com/"
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
        let path = format!("market/depth/L150/{}", self.pair_code(pair));
        let value = self.core.public_get(&path, &[]).await?;
        let data = self.data(value)?;

        let bids = parse_flat_levels(&data["bids"], "fcoin bids")?;
        let asks = parse_flat_levels(&data["asks"], "fcoin asks")?;
        let timestamp = parse_amount(&data["ts"]).unwrap_or(0.0);
        Ok(self.core.finish_maker(Maker::new(bids, asks, timestamp)))
    }

    async fn update_all_balances_for(&self, credentials: &Credentials) {
        if !credentials.is_complete() {
            warn!("Fcoin API key or secret is empty, skipping balance update");
            return;
        }
        let balances = match self
            .signed(Method::GET, "accounts/balance", Params::new(), credentials)
            .await
        {
            Ok(balances) => balances,
            Err(err) => {
                warn!(error = %err, "fcoin balance update failed");
                return;
            }
        };
        for entry in balances.as_array().into_iter().flatten() {
            if let (Some(currency), Some(available)) =
                (entry["currency"].as_str(), parse_amount(&entry["available"]))
            {
                self.core.record_balance(currency, available);
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
        params.insert("type".into(), "limit".into());
        params.insert(
            "side".into(),
            match side {
                Side::Buy => "buy".into(),
                Side::Sell => "sell".into(),
            },
        );
        params.insert("price".into(), rate.to_string());
        params.insert("amount".into(), quantity.to_string());

        let data = self
            .signed(Method::POST, "orders", params, &self.core.credentials())
            .await?;
        let order_id = OrderId::from_json(&data)
            .ok_or_else(|| self.core.parse_error(format!("order placed without id: {data}")))?;

        info!(%order_id, pair = %pair.name, %side, quantity, rate, "fcoin limit order placed");
        Ok(Order::placed(order_id, pair.clone(), side, quantity, rate, data))
    }

    async fn order_status(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        let data = self
            .signed(
                Method::GET,
                &format!("orders/{}", order.order_id),
                Params::new(),
                &self.core.credentials(),
            )
            .await?;
        match OrderId::from_json(&data["id"]) {
            Some(id) if id == order.order_id => {}
            other => {
                return Err(self.core.parse_error(format!(
                    "order id {other:?} does not match {}",
                    order.order_id
                )))
            }
        }
        let state = data["state"]
            .as_str()
            .ok_or_else(|| self.core.parse_error(format!("order without state: {data}")))?;
        order.status = map_state(state);
        Ok(())
    }

    async fn cancel_order(&self, order: &mut Order) -> Result<()> {
        self.core.check_order_id(order)?;
        self.signed(
            Method::POST,
            &format!("orders/{}/submit-cancel", order.order_id),
            Params::new(),
            &self.core.credentials(),
        )
        .await?;
        order.status = OrderStatus::Canceling;
        Ok(())
    }

    async fn withdraw(&self, coin: &Coin, quantity: f64, addr: &str, _tag: &str) -> Result<()> {
        self.core.check_withdraw(quantity, addr)?;
        let mut params = Params::new();
        params.insert(
            "currency".into(),
            self.core
                .translator()
                .to_exchange_code(&coin.code)
                .to_lowercase(),
        );
        params.insert("amount".into(), quantity.to_string());
        params.insert("address".into(), addr.to_string());

        self.signed(
            Method::POST,
            "broker/otc/assets/transfer/out",
            params,
            &self.core.credentials(),
        )
        .await?;
        info!(coin = %coin.code, quantity, "fcoin withdrawal requested");
        Ok(())
    }

    async fn update_pair_constraints(&self) -> Result<usize> {
        let symbols = self.symbols().await?;
        let constraints = symbols
            .iter()
            .map(|s| {
                let pair = self.symbol_pair(s);
                self.core.precision_constraint(&pair, s.amount_decimal, s.price_decimal)
            })
            .collect();
        self.core.store_pair_constraints(constraints).await
    }
}
