use thiserror::Error;

/// Errors surfaced by adapters, the signing layer and the market cache.
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials are missing or unusable; no request was sent.
    #[error("authentication error: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The exchange answered with a non-success status. `message` is the
    /// exchange's own text, untouched.
    #[error("{exchange} rejected the request: {message}")]
    ExchangeRejected { exchange: String, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cache miss for key {key}")]
    NotFound { key: String },

    #[error("cached value for key {key} is not decodable: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    /// The exchange offers no API for this operation.
    #[error("{exchange} does not support {operation}")]
    Unsupported {
        exchange: String,
        operation: &'static str,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn rejected(exchange: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExchangeRejected {
            exchange: exchange.into(),
            message: message.into(),
        }
    }

    pub fn parse(context: impl std::fmt::Display, detail: impl std::fmt::Display) -> Self {
        Error::Parse(format!("{context}: {detail}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Transport(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
