//! Signed REST client for the Prime venue.
//!
//! # Design
//! Every request carries four auth headers. The signature is
//! base64(HMAC-SHA256(secret, timestamp + METHOD + path + body)) where `path`
//! excludes the query string. Signing stays inside [`Credentials`].
//!
//! The client is `reqwest::blocking`. Build it outside any async context and
//! call it from the command loop or a blocking-pool thread.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::Client;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use tsh_config::Credentials;

use crate::{Balance, NewOrder, OrderPreview, OrderSummary, RestTransport, TransportError};

pub const HEADER_SIGNATURE: &str = "X-CB-ACCESS-SIGNATURE";
pub const HEADER_TIMESTAMP: &str = "X-CB-ACCESS-TIMESTAMP";
pub const HEADER_KEY: &str = "X-CB-ACCESS-KEY";
pub const HEADER_PASSPHRASE: &str = "X-CB-ACCESS-PASSPHRASE";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    Transport(String),
    Status { code: u16, body: String },
    Decode(String),
    NoBalance(String),
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::Transport(e) => write!(f, "request failed: {e}"),
            RestError::Status { code, body } => write!(f, "venue returned HTTP {code}: {body}"),
            RestError::Decode(e) => write!(f, "unexpected response body: {e}"),
            RestError::NoBalance(asset) => {
                write!(f, "no balance data available for asset '{asset}'")
            }
        }
    }
}

impl std::error::Error for RestError {}

#[derive(Deserialize)]
struct BalancesResponse {
    #[serde(default)]
    balances: Vec<Balance>,
}

#[derive(Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Vec<OrderSummary>,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    order_id: String,
}

pub struct PrimeRestClient {
    http: Client,
    base_url: String,
    portfolio_id: String,
    creds: Credentials,
}

impl PrimeRestClient {
    pub fn new(
        base_url: impl Into<String>,
        portfolio_id: impl Into<String>,
        creds: Credentials,
    ) -> Result<Self, RestError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RestError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            portfolio_id: portfolio_id.into(),
            creds,
        })
    }

    pub fn portfolio_id(&self) -> &str {
        &self.portfolio_id
    }

    fn portfolio_path(&self, suffix: &str) -> String {
        format!("/v1/portfolios/{}{}", self.portfolio_id, suffix)
    }

    /// Submit a new order. Returns the venue order id.
    pub fn create_order(&self, order: &NewOrder) -> Result<String, RestError> {
        let path = self.portfolio_path("/order");
        let body = order.to_payload(&self.portfolio_id).to_string();
        let resp: CreateOrderResponse = self.send(Method::POST, &path, &[], Some(body))?;
        Ok(resp.order_id)
    }

    pub fn balance(&self, asset: &str) -> Result<Balance, RestError> {
        let path = self.portfolio_path("/balances");
        let symbol = asset.to_ascii_uppercase();
        let resp: BalancesResponse = self.send(
            Method::GET,
            &path,
            &[("balance_type", "TRADING_BALANCES"), ("symbols", symbol.as_str())],
            None,
        )?;
        let mut b = resp
            .balances
            .into_iter()
            .next()
            .ok_or_else(|| RestError::NoBalance(symbol.clone()))?;
        if b.symbol.is_empty() {
            b.symbol = symbol;
        }
        Ok(b)
    }

    pub fn open_orders(&self) -> Result<Vec<OrderSummary>, RestError> {
        let path = self.portfolio_path("/open_orders");
        let resp: OrdersResponse = self.send(Method::GET, &path, &[], None)?;
        Ok(resp.orders)
    }

    pub fn all_orders(&self) -> Result<Vec<OrderSummary>, RestError> {
        let path = self.portfolio_path("/orders");
        let resp: OrdersResponse = self.send(Method::GET, &path, &[], None)?;
        Ok(resp.orders)
    }

    pub fn cancel(&self, venue_order_id: &str) -> Result<(), RestError> {
        let path = self.portfolio_path(&format!("/orders/{venue_order_id}/cancel"));
        let body = serde_json::json!({
            "portfolio_id": self.portfolio_id,
            "order_id": venue_order_id,
        })
        .to_string();
        self.send_raw(Method::POST, &path, &[], Some(body))?;
        Ok(())
    }

    pub fn preview(&self, order: &NewOrder) -> Result<OrderPreview, RestError> {
        let path = self.portfolio_path("/order_preview");
        let body = order.to_payload(&self.portfolio_id).to_string();
        self.send(Method::POST, &path, &[], Some(body))
    }

    // -----------------------------------------------------------------------
    // Signed transport
    // -----------------------------------------------------------------------

    fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<T, RestError> {
        let text = self.send_raw(method, path, query, body)?;
        serde_json::from_str(&text).map_err(|e| RestError::Decode(e.to_string()))
    }

    fn send_raw(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<String, RestError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self
            .creds
            .sign(&signing_message(&timestamp, &method, path, body.as_deref()))
            .map_err(|e| RestError::Transport(e.to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(HEADER_SIGNATURE, signature)
            .header(HEADER_TIMESTAMP, &timestamp)
            .header(HEADER_KEY, &self.creds.access_key)
            .header(HEADER_PASSPHRASE, &self.creds.passphrase)
            .header(reqwest::header::ACCEPT, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(b) = body {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(b);
        }

        let resp = req
            .send()
            .map_err(|e| RestError::Transport(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| RestError::Transport(e.to_string()))?;
        debug!(method = %method, path = %path, status = status.as_u16(), "venue rest call");

        if !status.is_success() {
            return Err(RestError::Status {
                code: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

/// `path` is the request path without the query string.
fn signing_message(timestamp: &str, method: &Method, path: &str, body: Option<&str>) -> String {
    format!("{}{}{}{}", timestamp, method.as_str(), path, body.unwrap_or(""))
}

impl RestTransport for PrimeRestClient {
    fn cancel_order(&self, venue_order_id: &str) -> Result<(), TransportError> {
        Ok(self.cancel(venue_order_id)?)
    }

    fn fetch_balance(&self, asset: &str) -> Result<Balance, TransportError> {
        Ok(self.balance(asset)?)
    }

    fn fetch_open_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        Ok(self.open_orders()?)
    }

    fn fetch_all_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        Ok(self.all_orders()?)
    }

    fn preview_order(&self, order: &NewOrder) -> Result<OrderPreview, TransportError> {
        Ok(self.preview(order)?)
    }
}
