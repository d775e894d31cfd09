//! L2 websocket feed client.
//!
//! # Design
//! One connection per subscription. The first text frame after subscribing is
//! the snapshot, every later one a delta, both handed to an
//! [`OrderBookMaintainer`] owned by the session task. After each frame the
//! live ladder goes to the caller's render callback.
//!
//! Reads run under a rolling idle deadline. Deadline expiry, socket errors and
//! server closes end the session; the client then waits a fixed delay and
//! reconnects with a fresh book. A snapshot that fails to parse ends the whole
//! subscription. The disconnect signal ends it cleanly at any point, including
//! during the reconnect delay.

use std::fmt;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};
use tsh_book::{BookError, Ladder, OrderBookMaintainer, UpdateOutcome, L2_CHANNEL};
use tsh_config::{Credentials, SigningError};

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub ws_url: String,
    pub idle_timeout: Duration,
    pub reconnect_delay: Duration,
}

#[derive(Debug)]
pub enum FeedError {
    /// Websocket connect or handshake failed.
    Connect(tungstenite::Error),
    /// Read or write failed on an open socket.
    Socket(tungstenite::Error),
    /// No frame within the idle deadline.
    Idle(Duration),
    /// Server closed the stream.
    Closed,
    /// First frame was not a usable snapshot.
    Snapshot(BookError),
    /// Subscribe frame could not be signed.
    Signing(SigningError),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Connect(e) => write!(f, "websocket connect failed: {e}"),
            FeedError::Socket(e) => write!(f, "websocket error: {e}"),
            FeedError::Idle(d) => write!(f, "no message for {}ms", d.as_millis()),
            FeedError::Closed => write!(f, "websocket closed by server"),
            FeedError::Snapshot(e) => write!(f, "snapshot rejected: {e}"),
            FeedError::Signing(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Connect(e) | FeedError::Socket(e) => Some(e),
            FeedError::Snapshot(e) => Some(e),
            FeedError::Signing(e) => Some(e),
            FeedError::Idle(_) | FeedError::Closed => None,
        }
    }
}

/// Signed `subscribe` frame for the L2 channel.
///
/// signature = base64(HMAC-SHA256(secret, channel + access_key + svc_account_id + timestamp + product))
pub fn subscribe_message(
    creds: &Credentials,
    product: &str,
    timestamp: i64,
) -> Result<String, SigningError> {
    let ts = timestamp.to_string();
    let payload = format!(
        "{}{}{}{}{}",
        L2_CHANNEL, creds.access_key, creds.svc_account_id, ts, product
    );
    let signature = creds.sign(&payload)?;
    Ok(serde_json::json!({
        "type": "subscribe",
        "channel": L2_CHANNEL,
        "access_key": creds.access_key,
        "api_key_id": creds.svc_account_id,
        "timestamp": ts,
        "passphrase": creds.passphrase,
        "signature": signature,
        "product_ids": [product],
    })
    .to_string())
}

pub struct FeedClient {
    cfg: FeedConfig,
    creds: Credentials,
}

impl FeedClient {
    pub fn new(cfg: FeedConfig, creds: Credentials) -> Self {
        Self { cfg, creds }
    }

    /// Stream `product` until `disconnect` flips to `true` (or its sender is
    /// dropped). Only a rejected snapshot or an unsignable subscribe returns
    /// an error.
    pub async fn run<F>(
        &self,
        product: &str,
        mut disconnect: watch::Receiver<bool>,
        mut render: F,
    ) -> Result<(), FeedError>
    where
        F: FnMut(&Ladder),
    {
        loop {
            if *disconnect.borrow() {
                return Ok(());
            }
            match self.session(product, &mut disconnect, &mut render).await {
                Ok(()) => return Ok(()),
                Err(e @ (FeedError::Snapshot(_) | FeedError::Signing(_))) => return Err(e),
                Err(e) => {
                    if *disconnect.borrow() {
                        return Ok(());
                    }
                    warn!(
                        product = %product,
                        error = %e,
                        delay_ms = self.cfg.reconnect_delay.as_millis() as u64,
                        "market data feed error, reconnecting"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.cfg.reconnect_delay) => {}
                        changed = disconnect.changed() => {
                            if changed.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }
        }
    }

    /// `Ok` only on operator disconnect.
    async fn session<F>(
        &self,
        product: &str,
        disconnect: &mut watch::Receiver<bool>,
        render: &mut F,
    ) -> Result<(), FeedError>
    where
        F: FnMut(&Ladder),
    {
        let (ws, _) = tokio_tungstenite::connect_async(self.cfg.ws_url.as_str())
            .await
            .map_err(FeedError::Connect)?;
        let (mut write, mut read) = ws.split();

        let sub = subscribe_message(&self.creds, product, Utc::now().timestamp())
            .map_err(FeedError::Signing)?;
        write
            .send(Message::Text(sub))
            .await
            .map_err(FeedError::Socket)?;
        info!(product = %product, channel = L2_CHANNEL, "subscribed");

        let mut book = OrderBookMaintainer::new(L2_CHANNEL);
        let idle = self.cfg.idle_timeout;

        loop {
            let frame = tokio::select! {
                changed = disconnect.changed() => {
                    if changed.is_err() || *disconnect.borrow() {
                        if let Err(e) = write.close().await {
                            debug!(error = %e, "websocket close failed");
                        }
                        info!(product = %product, "market data disconnected");
                        return Ok(());
                    }
                    continue;
                }
                next = tokio::time::timeout(idle, read.next()) => next,
            };

            let msg = match frame {
                Err(_) => return Err(FeedError::Idle(idle)),
                Ok(None) => return Err(FeedError::Closed),
                Ok(Some(Err(e))) => return Err(FeedError::Socket(e)),
                Ok(Some(Ok(m))) => m,
            };

            match msg {
                Message::Text(text) => {
                    if book.is_live() {
                        match book.apply_update(&text) {
                            Ok(UpdateOutcome::Applied { applied, dropped }) => {
                                debug!(product = %product, applied, dropped, "l2 delta applied");
                            }
                            Ok(UpdateOutcome::Ignored) => {
                                debug!(product = %product, "message for another channel ignored");
                                continue;
                            }
                            // Logged by the maintainer; the delta is dropped.
                            Err(_) => continue,
                        }
                    } else {
                        book.init_from_snapshot(&text)
                            .map_err(FeedError::Snapshot)?;
                    }
                    if let Some(ladder) = book.ladder() {
                        render(ladder);
                    }
                }
                Message::Close(_) => return Err(FeedError::Closed),
                _ => {}
            }
        }
    }
}
