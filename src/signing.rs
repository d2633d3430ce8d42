//! Request signing for private endpoints.
//!
//! Every scheme turns `(method, path, params, credentials)` into a ready to
//! send [`HttpRequest`]. Schemes that embed a timestamp or nonce take it from
//! the clock passed to [`Signer::sign_at`]; [`Signer::sign`] reads the wall
//! clock, so a retried call must be signed again.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest as _, Md5};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::{Error, Result};
use crate::transport::HttpRequest;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;
type HmacSha1 = Hmac<Sha1>;

/// Request parameters. Kept sorted by key, which is what every scheme's
/// canonical form needs.
pub type Params = BTreeMap<String, String>;

#[derive(Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    pub two_factor: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Credentials {
        Credentials {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            two_factor: None,
        }
    }

    pub fn with_two_factor(mut self, code: impl Into<String>) -> Credentials {
        self.two_factor = Some(code.into());
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.api_secret.is_empty()
    }

    pub fn require(&self, exchange: &str) -> Result<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(Error::Auth(format!("{exchange} API key or secret is empty")))
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask(&self.api_key))
            .field("api_secret", &"***")
            .field("two_factor", &self.two_factor.as_ref().map(|_| "***"))
            .finish()
    }
}

fn mask(key: &str) -> String {
    match key.get(..4) {
        Some(prefix) if key.len() > 8 => format!("{prefix}***"),
        _ => "***".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// Sorted `k=v&...` query, hex HMAC-SHA256, `signature` query param.
    SortedQuerySha256,
    /// Sorted `kv...` payload, hex MD5 of payload + secret, `sign` param.
    SortedConcatMd5,
    /// Base64 HMAC-SHA1 over base64(method + url + timestamp [+ query]).
    PathTimestampSha1,
    /// Base64 HMAC-SHA512 over path + SHA256(json body), decoded secret.
    PathBodySha512,
}

#[derive(Debug, Clone)]
pub struct Signer {
    scheme: SigningScheme,
    base_url: String,
}

impl Signer {
    pub fn new(scheme: SigningScheme, base_url: impl Into<String>) -> Signer {
        Signer {
            scheme,
            base_url: base_url.into(),
        }
    }

    pub fn scheme(&self) -> SigningScheme {
        self.scheme
    }

    pub fn sign(
        &self,
        method: Method,
        path: &str,
        params: Params,
        credentials: &Credentials,
    ) -> Result<HttpRequest> {
        self.sign_at(method, path, params, credentials, Utc::now())
    }

    pub fn sign_at(
        &self,
        method: Method,
        path: &str,
        mut params: Params,
        credentials: &Credentials,
        now: DateTime<Utc>,
    ) -> Result<HttpRequest> {
        if !credentials.is_complete() {
            return Err(Error::Auth(
                "refusing to sign a request without API key and secret".into(),
            ));
        }
        let url = format!("{}{}", self.base_url, path);
        let millis = now.timestamp_millis().to_string();

        match self.scheme {
            SigningScheme::SortedQuerySha256 => {
                params.insert("timestamp".into(), millis);
                let query = canonical_query(&params);
                let signature = hmac_sha256_hex(&credentials.api_secret, &query)?;

                let mut headers = HeaderMap::new();
                headers.insert(
                    HeaderName::from_static("x-mbx-apikey"),
                    header_value(&credentials.api_key)?,
                );
                headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded;charset=utf-8"),
                );
                Ok(HttpRequest {
                    method,
                    url: format!("{url}?{query}&signature={signature}"),
                    headers,
                    body: None,
                })
            }
            SigningScheme::SortedConcatMd5 => {
                params.insert("api_key".into(), credentials.api_key.clone());
                params.insert("time".into(), millis);
                let sign = md5_hex(&concat_payload(&params), &credentials.api_secret);
                params.insert("sign".into(), sign);

                let encoded = serde_urlencoded::to_string(&params)
                    .map_err(|e| Error::InvalidInput(format!("cannot encode params: {e}")))?;
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                if method == Method::GET {
                    Ok(HttpRequest {
                        method,
                        url: format!("{url}?{encoded}"),
                        headers,
                        body: None,
                    })
                } else {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/x-www-form-urlencoded"),
                    );
                    Ok(HttpRequest {
                        method,
                        url,
                        headers,
                        body: Some(encoded),
                    })
                }
            }
            SigningScheme::PathTimestampSha1 => {
                let query = canonical_query(&params);
                let (target, message, body) = if method == Method::GET {
                    let target = if params.is_empty() {
                        url
                    } else {
                        format!("{url}?{query}")
                    };
                    let message = format!("GET{target}{millis}");
                    (target, message, None)
                } else {
                    let body = serde_json::to_string(&params)
                        .map_err(|e| Error::InvalidInput(format!("cannot encode params: {e}")))?;
                    let message = format!("{method}{url}{millis}{query}");
                    (url, message, Some(body))
                };
                let signature = hmac_sha1_base64(&credentials.api_secret, &BASE64.encode(message))?;

                let mut headers = HeaderMap::new();
                headers.insert(
                    HeaderName::from_static("fc-access-key"),
                    header_value(&credentials.api_key)?,
                );
                headers.insert(
                    HeaderName::from_static("fc-access-signature"),
                    header_value(&signature)?,
                );
                headers.insert(
                    HeaderName::from_static("fc-access-timestamp"),
                    header_value(&millis)?,
                );
                if body.is_some() {
                    headers.insert(
                        CONTENT_TYPE,
                        HeaderValue::from_static("application/json;charset=UTF-8"),
                    );
                }
                Ok(HttpRequest {
                    method,
                    url: target,
                    headers,
                    body,
                })
            }
            SigningScheme::PathBodySha512 => {
                let nonce = now
                    .timestamp_nanos_opt()
                    .unwrap_or_else(|| now.timestamp_millis() * 1_000_000);
                params.insert("nonce".into(), nonce.to_string());
                if let Some(otp) = credentials.two_factor.as_ref().filter(|s| !s.is_empty()) {
                    params.insert("otp".into(), otp.clone());
                }
                let body = serde_json::to_string(&params)
                    .map_err(|e| Error::InvalidInput(format!("cannot encode params: {e}")))?;
                let signature = path_body_signature(path, &body, &credentials.api_secret)?;

                let mut headers = HeaderMap::new();
                headers.insert(
                    HeaderName::from_static("api-key"),
                    header_value(&credentials.api_key)?,
                );
                headers.insert(
                    HeaderName::from_static("api-sign"),
                    header_value(&signature)?,
                );
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Ok(HttpRequest {
                    method,
                    url,
                    headers,
                    body: Some(body),
                })
            }
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Auth("credential contains characters not allowed in a header".into()))
}

/// `k1=v1&k2=v2` in key order, values as given.
pub fn canonical_query(params: &Params) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// `k1v1k2v2` in key order.
pub fn concat_payload(params: &Params) -> String {
    params.iter().map(|(k, v)| format!("{k}{v}")).collect()
}

pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Auth(format!("invalid secret: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn md5_hex(payload: &str, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn hmac_sha1_base64(secret: &str, message: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Auth(format!("invalid secret: {e}")))?;
    mac.update(message.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// HMAC-SHA512 of (path + SHA256(body)) keyed with the base64-decoded secret.
pub fn path_body_signature(path: &str, body: &str, secret: &str) -> Result<String> {
    let body_digest = Sha256::digest(body.as_bytes());
    let private_key = BASE64
        .decode(secret)
        .map_err(|e| Error::Auth(format!("API secret is not valid base64: {e}")))?;
    let mut mac = HmacSha512::new_from_slice(&private_key)
        .map_err(|e| Error::Auth(format!("invalid secret: {e}")))?;

    let mut hmac_data = path.as_bytes().to_vec();
    hmac_data.extend_from_slice(&body_digest);
    mac.update(&hmac_data);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}
