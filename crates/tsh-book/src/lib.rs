//! tsh-book
//!
//! Incremental L2 order-book maintenance for one market-data subscription.
//!
//! - `ladder`: sorted bid/ask price levels with top-N queries
//! - `maintainer`: snapshot + delta application, topic filtering
//! - `wire`: the string-encoded level triples as they arrive on the feed
//!
//! Nothing here is `Sync`-guarded. A book belongs to exactly one reader task;
//! callers serialize access externally.

mod ladder;
mod maintainer;
pub mod wire;

pub use ladder::{BookSide, Depth, Ladder, PriceLevel, MAX_DEPTH};
pub use maintainer::{BookError, OrderBookMaintainer, UpdateOutcome, L2_CHANNEL};
pub use wire::LevelError;
