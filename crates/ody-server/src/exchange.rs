//! Signed client for the exchange's brokerage API.
//!
//! Every request carries `CB-ACCESS-KEY`, `CB-ACCESS-TIMESTAMP` (unix seconds)
//! and `CB-ACCESS-SIGN`, the hex HMAC-SHA256 of `timestamp + METHOD + path +
//! body` under the API secret.

use hmac::{Hmac, Mac};
use ody_core::config::ExchangeConfig;
use ody_core::{Error, Result};
use reqwest::Method;
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "coinbase";

pub const HEADER_KEY: &str = "CB-ACCESS-KEY";
pub const HEADER_SIGN: &str = "CB-ACCESS-SIGN";
pub const HEADER_TIMESTAMP: &str = "CB-ACCESS-TIMESTAMP";

const ACCOUNTS_PATH: &str = "/api/v3/brokerage/accounts";
const PRODUCTS_PATH: &str = "/api/v3/brokerage/products";
const ORDERS_PATH: &str = "/api/v3/brokerage/orders";
const ORDERS_HISTORY_PATH: &str = "/api/v3/brokerage/orders/historical/batch";
const CANCEL_PATH: &str = "/api/v3/brokerage/orders/batch_cancel";

struct Credentials {
    key: String,
    secret: String,
}

pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

/// `hex(HMAC-SHA256(secret, timestamp + method + path + body))`.
pub fn sign(secret: &str, timestamp: &str, method: &str, path: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::Internal(format!("invalid signing key: {e}")))?;
    mac.update(timestamp.as_bytes());
    mac.update(method.as_bytes());
    mac.update(path.as_bytes());
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

impl ExchangeClient {
    pub fn new(config: &ExchangeConfig) -> Self {
        let credentials = match (config.api_key.as_deref(), config.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(Credentials {
                    key: key.to_string(),
                    secret: secret.to_string(),
                })
            }
            _ => None,
        };
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Result<&Credentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| Error::Config("exchange API credentials are not configured".into()))
    }

    /// Send a signed request and decode the JSON response.
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let creds = self.credentials()?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let body_string = match body {
            Some(b) => serde_json::to_string(b)
                .map_err(|e| Error::Internal(format!("failed to encode request body: {e}")))?,
            None => String::new(),
        };
        let signature = sign(&creds.secret, &timestamp, method.as_str(), path, &body_string)?;

        let mut req = self
            .http
            .request(method.clone(), format!("{}{path}", self.base_url))
            .header(HEADER_KEY, &creds.key)
            .header(HEADER_SIGN, signature)
            .header(HEADER_TIMESTAMP, &timestamp)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if !body_string.is_empty() {
            req = req.body(body_string);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::upstream(SERVICE, None, format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            tracing::warn!(%method, path, status = status.as_u16(), "Exchange request failed");
            return Err(Error::upstream(SERVICE, Some(status.as_u16()), text));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| Error::upstream(SERVICE, None, format!("invalid response body: {e}")))
    }

    // -----------------------------------------------------------------------
    // Endpoints
    // -----------------------------------------------------------------------

    pub async fn accounts(&self) -> Result<Value> {
        self.request(Method::GET, ACCOUNTS_PATH, None).await
    }

    pub async fn products(&self) -> Result<Value> {
        self.request(Method::GET, PRODUCTS_PATH, None).await
    }

    /// Fetch one product. `product_id` becomes a path segment, so anything
    /// but `BASE-QUOTE` alphanumerics is refused before a request is made.
    pub async fn product(&self, product_id: &str) -> Result<Value> {
        if !is_product_id(product_id) {
            return Err(Error::Validation(format!("Invalid symbol: {product_id}")));
        }
        self.request(Method::GET, &format!("{PRODUCTS_PATH}/{product_id}"), None)
            .await
    }

    /// Spot price for `product_id`, or `None` if it cannot be fetched.
    pub async fn spot_price(&self, product_id: &str) -> Option<f64> {
        match self.product(product_id).await {
            Ok(data) => Some(decimal_field(&data["price"])),
            Err(e) => {
                tracing::warn!(product_id, error = %e, "Price lookup failed");
                None
            }
        }
    }

    pub async fn place_order(&self, order: &Value) -> Result<Value> {
        self.request(Method::POST, ORDERS_PATH, Some(order)).await
    }

    pub async fn orders(&self) -> Result<Value> {
        self.request(Method::GET, ORDERS_HISTORY_PATH, None).await
    }

    pub async fn cancel_orders(&self, order_ids: &[&str]) -> Result<Value> {
        self.request(Method::POST, CANCEL_PATH, Some(&json!({ "order_ids": order_ids })))
            .await
    }
}

/// `BASE-QUOTE`, each side one or more uppercase ASCII letters or digits.
pub fn is_product_id(s: &str) -> bool {
    let part = |p: &str| {
        !p.is_empty() && p.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    };
    match s.split_once('-') {
        Some((base, quote)) => part(base) && part(quote),
        None => false,
    }
}

/// Read a decimal the exchange encodes as a string (or occasionally a
/// number). Anything unparseable is zero.
pub fn decimal_field(v: &Value) -> f64 {
    match v {
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}
