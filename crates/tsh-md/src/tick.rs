//! Price source boundary and the HTTP ticker provider.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Tick
// ---------------------------------------------------------------------------

/// Last observed top of book and trade price for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub product: String,
    pub bid: Decimal,
    pub ask: Decimal,
    /// Last trade price. This is the price stop triggers are evaluated against.
    pub price: Decimal,
    pub received_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum PriceSourceError {
    /// Network or transport failure.
    Transport(String),
    /// Upstream answered with a non-2xx status.
    Status { product: String, code: u16 },
    /// Response body could not be decoded.
    Decode(String),
}

impl fmt::Display for PriceSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSourceError::Transport(msg) => write!(f, "transport error: {msg}"),
            PriceSourceError::Status { product, code } => {
                write!(f, "ticker http error status={code} product={product}")
            }
            PriceSourceError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for PriceSourceError {}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_tick(&self, product: &str) -> Result<Tick, PriceSourceError>;
}

/// Public exchange ticker (`GET {base}/products/{product}/ticker`). No auth.
#[derive(Debug, Clone)]
pub struct TickerPriceSource {
    http: reqwest::Client,
    base_url: String,
}

impl TickerPriceSource {
    pub fn new() -> Self {
        Self::new_with_base_url("https://api.exchange.coinbase.com".to_string())
    }

    pub fn new_with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn ticker_url(&self, product: &str) -> String {
        format!(
            "{}/products/{}/ticker",
            self.base_url.trim_end_matches('/'),
            product
        )
    }
}

impl Default for TickerPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    bid: Decimal,
    ask: Decimal,
    price: Decimal,
}

#[async_trait::async_trait]
impl PriceSource for TickerPriceSource {
    async fn fetch_tick(&self, product: &str) -> Result<Tick, PriceSourceError> {
        let resp = self
            .http
            .get(self.ticker_url(product))
            // The public ticker rejects requests without a user agent.
            .header(reqwest::header::USER_AGENT, "tsh")
            .send()
            .await
            .map_err(|e| PriceSourceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PriceSourceError::Status {
                product: product.to_string(),
                code: status.as_u16(),
            });
        }

        let body: TickerResponse = resp
            .json()
            .await
            .map_err(|e| PriceSourceError::Decode(e.to_string()))?;

        Ok(Tick {
            product: product.to_string(),
            bid: body.bid,
            ask: body.ask,
            price: body.price,
            received_at: Utc::now(),
        })
    }
}
