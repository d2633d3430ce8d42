use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};
use crate::exchanges::ExchangeName;
use crate::signing::Credentials;
use crate::transport::DEFAULT_TIMEOUT;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Keyed by lower-case exchange name (`kraken`, `bitrue`, ...).
    #[serde(default)]
    pub exchanges: HashMap<String, ExchangeConfig>,
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Settings> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut settings = Settings::from_toml(&raw)?;
        settings.resolve_credentials()?;
        Ok(settings)
    }

    pub fn from_toml(raw: &str) -> Result<Settings> {
        toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Fills credentials from `credentials_file` and then from
    /// `<EXCHANGE>_API_KEY` / `<EXCHANGE>_API_SECRET`, later sources winning.
    fn resolve_credentials(&mut self) -> Result<()> {
        for (name, config) in self.exchanges.iter_mut() {
            if let Some(file) = &config.credentials_file {
                let creds = read_api_credentials_from_file(file)?;
                config.api_key = creds.api_key;
                config.api_secret = creds.api_secret;
            }
            let prefix = name.to_uppercase();
            if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
                config.api_key = key;
            }
            if let Ok(secret) = std::env::var(format!("{prefix}_API_SECRET")) {
                config.api_secret = secret;
            }
        }
        Ok(())
    }

    pub fn exchange(&self, name: ExchangeName) -> ExchangeConfig {
        self.exchanges
            .get(&name.as_str().to_lowercase())
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// The per-exchange record handed to an adapter at construction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeConfig {
    /// `host:port`; without it the adapter caches in process memory.
    pub redis_server: Option<String>,
    #[serde(default)]
    pub redis_db: i64,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    pub two_factor: Option<String>,
    /// Optional `api_key:` / `api_sec:` line file.
    pub credentials_file: Option<String>,
    pub worker_ip: Option<String>,
    /// Manual wallet flags for exchanges whose API does not publish them.
    #[serde(default)]
    pub wallet_status: Vec<WalletStatus>,
    /// Pair keys (`"BTC|ETH"`) the driver polls order books for.
    #[serde(default)]
    pub watch_pairs: Vec<String>,
}

impl ExchangeConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            two_factor: self.two_factor.clone(),
        }
    }

    pub fn wallet_status(&self, coin: &str) -> Option<&WalletStatus> {
        self.wallet_status
            .iter()
            .find(|w| w.coin.eq_ignore_ascii_case(coin))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WalletStatus {
    pub coin: String,
    #[serde(default)]
    pub withdraw: bool,
    #[serde(default)]
    pub deposit: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    /// Installs the global tracing subscriber. `RUST_LOG` wins over `level`.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format.as_str() {
            "json" => {
                fmt().json().with_env_filter(filter).init();
            }
            _ => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

pub(crate) fn read_api_credentials_from_file(file_path: &str) -> Result<Credentials> {
    let file = File::open(file_path)
        .map_err(|e| Error::Config(format!("cannot open credentials file {file_path}: {e}")))?;
    let reader = BufReader::new(file);
    let mut credentials = Credentials::default();

    for line in reader.lines() {
        let line = line.map_err(|e| Error::Config(format!("{file_path}: {e}")))?;
        if let Some(key) = line.strip_prefix("api_key:") {
            credentials.api_key = key.trim().to_string();
        } else if let Some(secret) = line.strip_prefix("api_sec:") {
            credentials.api_secret = secret.trim().to_string();
        }
    }

    Ok(credentials)
}
