use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::future::join_all;
use tokio::task;
use tracing::{debug, info, warn};

use coinbridge::exchanges::{AdapterRegistry, Exchange, ExchangeName};
use coinbridge::model::Pair;
use coinbridge::transport::HttpTransport;
use coinbridge::utils::config::Settings;

const DEFAULT_CONFIG_PATH: &str = "config/coinbridge.toml";
const BALANCE_REFRESH: Duration = Duration::from_secs(30);
const BOOK_REFRESH: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let settings =
        Settings::load(&path).with_context(|| format!("failed to load configuration {path}"))?;
    settings.logging.init();

    let enabled: Vec<ExchangeName> = ExchangeName::ALL
        .into_iter()
        .filter(|name| {
            settings
                .exchanges
                .contains_key(&name.as_str().to_lowercase())
        })
        .collect();
    if enabled.is_empty() {
        warn!(%path, "no exchanges configured, nothing to do");
        return Ok(());
    }

    let transport = Arc::new(HttpTransport::new(settings.http.timeout()));
    let registry = AdapterRegistry::new(settings, transport);

    let mut watched: Vec<(Arc<dyn Exchange>, Vec<Arc<Pair>>)> = Vec::new();
    for name in enabled {
        let exchange = registry
            .get(name)
            .await
            .with_context(|| format!("failed to start {name} adapter"))?;

        match exchange.update_pair_constraints().await {
            Ok(count) => info!(exchange = %name, count, "pair constraints refreshed"),
            Err(err) => warn!(exchange = %name, error = %err, "pair constraints unavailable"),
        }

        let pairs = watched_pairs(&registry, name);
        info!(exchange = %name, pairs = pairs.len(), "watching order books");
        spawn_balance_refresh(exchange.clone());
        watched.push((exchange, pairs));
    }

    let mut interval = tokio::time::interval(BOOK_REFRESH);
    loop {
        tokio::select! {
            _ = interval.tick() => refresh_books(&watched).await,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                return Ok(());
            }
        }
    }
}

fn watched_pairs(registry: &AdapterRegistry, name: ExchangeName) -> Vec<Arc<Pair>> {
    registry
        .settings()
        .exchange(name)
        .watch_pairs
        .iter()
        .filter_map(|key| {
            let pair = registry.market().pair_by_key(key);
            if pair.is_none() {
                warn!(exchange = %name, pair = %key, "watched pair is not listed");
            }
            pair
        })
        .collect()
}

fn spawn_balance_refresh(exchange: Arc<dyn Exchange>) {
    task::spawn(async move {
        let mut interval = tokio::time::interval(BALANCE_REFRESH);
        loop {
            interval.tick().await;
            exchange.update_all_balances().await;
            debug!(
                exchange = %exchange.name(),
                coins = exchange.core().balances().len(),
                "balances refreshed"
            );
        }
    });
}

async fn refresh_books(watched: &[(Arc<dyn Exchange>, Vec<Arc<Pair>>)]) {
    let jobs = watched.iter().flat_map(|(exchange, pairs)| {
        pairs.iter().map(move |pair| async move {
            let result = match exchange.order_book(pair).await {
                Ok(maker) => exchange.update_maker(pair, &maker).await,
                Err(err) => Err(err),
            };
            (exchange.name(), pair, result)
        })
    });

    for (name, pair, result) in join_all(jobs).await {
        if let Err(err) = result {
            warn!(exchange = %name, pair = %pair.name, error = %err, "order book refresh failed");
        }
    }
}
