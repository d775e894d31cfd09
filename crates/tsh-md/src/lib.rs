//! tsh-md
//!
//! Market data for the console: ticker prices (polled, cached, and fed to the
//! trigger evaluator) and the L2 websocket feed that drives the order book.

mod cache;
mod feed;
mod poller;
mod tick;

pub use cache::PriceCache;
pub use feed::{subscribe_message, FeedClient, FeedConfig, FeedError};
pub use poller::{poll_once, spawn_price_poller};
pub use tick::{PriceSource, PriceSourceError, Tick, TickerPriceSource};

/// `BASE-QUOTE`, both parts non-empty ASCII alphanumerics.
pub fn validate_product(product: &str) -> bool {
    let mut parts = product.split('-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(base), Some(quote), None) => {
            [base, quote]
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
        }
        _ => false,
    }
}

/// Base asset of a product (`"ETH"` for `"ETH-USD"`).
pub fn base_asset(product: &str) -> &str {
    product.split('-').next().unwrap_or(product)
}
