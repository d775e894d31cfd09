//! L2 feed wire types.
//!
//! Level triples arrive with string-encoded decimals:
//!
//! ```text
//! {"channel":"l2_data","events":[{"updates":[{"side":"bid","px":"1500.10","qty":"2.0"}]}]}
//! ```
//!
//! `px` / `qty` are declared as `String` so a numeric-typed payload fails to
//! deserialize instead of silently passing through a float.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{BookSide, PriceLevel};

pub const SIDE_BID: &str = "bid";
pub const SIDE_OFFER: &str = "offer";

/// Top-level feed message (snapshot or delta).
#[derive(Debug, Clone, Deserialize)]
pub struct L2Message {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub events: Vec<L2Event>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct L2Event {
    #[serde(default)]
    pub updates: Vec<WireLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireLevel {
    pub side: String,
    pub px: String,
    pub qty: String,
}

impl L2Message {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// All level updates across every batch, in message order.
    pub fn updates(&self) -> impl Iterator<Item = &WireLevel> {
        self.events.iter().flat_map(|e| e.updates.iter())
    }
}

// ---------------------------------------------------------------------------
// Level conversion
// ---------------------------------------------------------------------------

/// Why a single wire level could not become a [`PriceLevel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelError {
    UnknownSide(String),
    InvalidDecimal { field: &'static str, raw: String },
    NegativeQuantity(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::UnknownSide(s) => write!(f, "unrecognized side: '{s}'"),
            LevelError::InvalidDecimal { field, raw } => {
                write!(f, "field '{field}' is not a decimal: '{raw}'")
            }
            LevelError::NegativeQuantity(raw) => write!(f, "negative quantity: '{raw}'"),
        }
    }
}

impl std::error::Error for LevelError {}

fn parse_side(s: &str) -> Result<BookSide, LevelError> {
    match s {
        SIDE_BID => Ok(BookSide::Bid),
        SIDE_OFFER => Ok(BookSide::Ask),
        other => Err(LevelError::UnknownSide(other.to_string())),
    }
}

fn parse_decimal(raw: &str, field: &'static str) -> Result<Decimal, LevelError> {
    Decimal::from_str(raw.trim()).map_err(|_| LevelError::InvalidDecimal {
        field,
        raw: raw.to_string(),
    })
}

impl TryFrom<&WireLevel> for PriceLevel {
    type Error = LevelError;

    fn try_from(w: &WireLevel) -> Result<Self, Self::Error> {
        let side = parse_side(&w.side)?;
        let price = parse_decimal(&w.px, "px")?;
        let quantity = parse_decimal(&w.qty, "qty")?;
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(LevelError::NegativeQuantity(w.qty.clone()));
        }
        Ok(PriceLevel::new(side, price, quantity))
    }
}
