//! Trade input syntax.
//!
//! `PRODUCT mkt|lim b|s [LIMIT_PRICE] BASE_QTY [-p] [-s STOP_PRICE]`
//!
//! Flags may appear anywhere after the product. `-p` asks for a venue preview
//! before submitting; `-s` attaches a stop to a limit order.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use tsh_broker::NewOrder;
use tsh_oco::{OrderType, Side};
use tsh_risk::OrderCheck;

pub const HELP: &str = "\
Accepts market (mkt) and limit (lim) base quantity orders.
Append '-p' to preview an order before it is sent.
Append '-s STOP_PRICE' to a limit order to attach a stop order.
Format: product mkt|lim b|s [lim_price] base_quantity [-p] [-s stop_price]
Ex: eth-usd mkt s 0.001
Ex: eth-usd lim b 1400 0.001
Ex: ltc-usd lim s 100 15 -p
Ex: eth-usd lim b 1500 0.001 -s 1450";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeInput {
    Help,
    Order(TradeCommand),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeCommand {
    pub product: String,
    pub order_type: OrderType,
    pub side: Side,
    pub limit_price: Option<Decimal>,
    pub base_quantity: Decimal,
    pub preview: bool,
    pub stop_price: Option<Decimal>,
}

impl TradeCommand {
    /// Fresh order with a new client order id.
    pub fn to_new_order(&self) -> NewOrder {
        match self.limit_price {
            Some(px) => NewOrder::limit(self.product.clone(), self.side, px, self.base_quantity),
            None => NewOrder::market(self.product.clone(), self.side, self.base_quantity),
        }
    }

    pub fn risk_check(&self) -> OrderCheck {
        OrderCheck {
            product: self.product.clone(),
            side: self.side,
            order_type: self.order_type,
            limit_price: self.limit_price,
            base_quantity: self.base_quantity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeParseError {
    Insufficient,
    BadProduct(String),
    UnknownOrderType(String),
    UnknownSide(String),
    BadNumber { field: &'static str, value: String },
    TooManyArgs(String),
    StopWithoutPrice,
    StopOnMarketOrder,
}

impl fmt::Display for TradeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeParseError::Insufficient => write!(f, "insufficient parameters"),
            TradeParseError::BadProduct(p) => {
                write!(f, "invalid product '{p}', expected BASE-QUOTE")
            }
            TradeParseError::UnknownOrderType(t) => {
                write!(f, "unknown order type '{t}', expected mkt or lim")
            }
            TradeParseError::UnknownSide(s) => write!(f, "unknown side '{s}', expected b or s"),
            TradeParseError::BadNumber { field, value } => {
                write!(f, "invalid {field} '{value}'")
            }
            TradeParseError::TooManyArgs(a) => write!(f, "unexpected argument '{a}'"),
            TradeParseError::StopWithoutPrice => write!(f, "-s needs a stop price"),
            TradeParseError::StopOnMarketOrder => {
                write!(f, "a stop can only be attached to a limit order")
            }
        }
    }
}

impl std::error::Error for TradeParseError {}

fn positive(field: &'static str, raw: &str) -> Result<Decimal, TradeParseError> {
    match Decimal::from_str(raw) {
        Ok(v) if v > Decimal::ZERO => Ok(v),
        _ => Err(TradeParseError::BadNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

pub fn parse_trade(input: &str) -> Result<TradeInput, TradeParseError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("h")) {
        return Ok(TradeInput::Help);
    }

    let mut preview = false;
    let mut stop_raw = None;
    let mut positional = Vec::with_capacity(tokens.len());
    let mut it = tokens.into_iter();
    while let Some(t) = it.next() {
        match t {
            "-p" => preview = true,
            "-s" => stop_raw = Some(it.next().ok_or(TradeParseError::StopWithoutPrice)?),
            _ => positional.push(t),
        }
    }

    if positional.len() < 4 {
        return Err(TradeParseError::Insufficient);
    }

    let product = positional[0].to_ascii_uppercase();
    if !tsh_md::validate_product(&product) {
        return Err(TradeParseError::BadProduct(product));
    }

    let order_type = match positional[1].to_ascii_lowercase().as_str() {
        "mkt" | "market" => OrderType::Market,
        "lim" | "limit" => OrderType::Limit,
        other => return Err(TradeParseError::UnknownOrderType(other.to_string())),
    };

    let side = match positional[2].to_ascii_lowercase().as_str() {
        "b" | "buy" => Side::Buy,
        "s" | "sell" => Side::Sell,
        other => return Err(TradeParseError::UnknownSide(other.to_string())),
    };

    let (limit_price, qty_raw, rest) = match order_type {
        OrderType::Market => (None, positional[3], &positional[4..]),
        OrderType::Limit => {
            let qty = positional.get(4).ok_or(TradeParseError::Insufficient)?;
            (Some(positive("limit price", positional[3])?), *qty, &positional[5..])
        }
    };
    if let Some(extra) = rest.first() {
        return Err(TradeParseError::TooManyArgs(extra.to_string()));
    }
    let base_quantity = positive("base quantity", qty_raw)?;

    let stop_price = match stop_raw {
        Some(_) if order_type == OrderType::Market => {
            return Err(TradeParseError::StopOnMarketOrder)
        }
        Some(raw) => Some(positive("stop price", raw)?),
        None => None,
    };

    Ok(TradeInput::Order(TradeCommand {
        product,
        order_type,
        side,
        limit_price,
        base_quantity,
        preview,
        stop_price,
    }))
}
