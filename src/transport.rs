//! Outbound HTTP: one request in, response body text out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> HttpRequest {
        HttpRequest {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// GET with `params` appended as a url-encoded query string.
    pub fn get_with_params<I, K, V>(url: &str, params: I) -> Result<HttpRequest>
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<(K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = reqwest::Url::parse_with_params(url, params)
            .map_err(|e| Error::InvalidInput(format!("bad url {url}: {e}")))?;
        Ok(HttpRequest::get(url.to_string()))
    }
}

/// Sends a request and returns the body. HTTP status codes are not errors
/// here; each exchange reports failures in its own body format.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<String>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> HttpTransport {
        HttpTransport {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl Default for HttpTransport {
    fn default() -> HttpTransport {
        HttpTransport::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        debug!(method = %request.method, url = %without_query(&request.url), "sending request");
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .timeout(self.timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%status, bytes = text.len(), "response received");
        Ok(text)
    }
}

/// Signed GETs carry the key and signature in the query string.
fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
