//! tsh-risk
//!
//! Fat-finger protection for order entry.
//!
//! - Notional cap: `best price x quantity` must not exceed the configured max.
//! - Limit price band: a buy limit may sit at most 5% above the bid, a sell
//!   limit at most 5% below the ask.
//! - Products with no cached price are allowed with a warning.
//!
//! Pure decimal logic over a [`tsh_md::PriceCache`] read. No I/O.

mod engine;
mod types;

pub use engine::{evaluate, FatFingerValidator};
pub use types::*;
