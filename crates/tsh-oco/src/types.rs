use std::fmt;

use rust_decimal::Decimal;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending stop order paired with a resting limit order.
///
/// Created provisional (`venue_order_id == None`) when the limit order is sent,
/// keyed by the limit order's `client_order_id`. Confirmed once an execution
/// report correlates that id to the venue-assigned order id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContingentOrder {
    pub product: String,
    pub side: Side,
    pub base_quantity: Decimal,
    pub trigger_price: Decimal,
    /// Venue id of the paired limit order. `Some` for every confirmed entry.
    pub venue_order_id: Option<String>,
    /// Client id of the paired limit order.
    pub client_order_id: String,
}

impl ContingentOrder {
    pub fn provisional(
        product: impl Into<String>,
        side: Side,
        base_quantity: Decimal,
        trigger_price: Decimal,
        client_order_id: impl Into<String>,
    ) -> Self {
        Self {
            product: product.into(),
            side,
            base_quantity,
            trigger_price,
            venue_order_id: None,
            client_order_id: client_order_id.into(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.venue_order_id.is_some()
    }
}

/// Execution report as delivered by the session transport.
///
/// `exec_type` is the raw venue code (`"0"`, `"2"`, `"F"`, ...); normalize it
/// with [`crate::ExecType::from_code`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub exec_type: String,
    pub text: Option<String>,
    pub venue_order_id: String,
    pub client_order_id: String,
}

impl ExecutionReport {
    pub fn new(
        exec_type: impl Into<String>,
        venue_order_id: impl Into<String>,
        client_order_id: impl Into<String>,
    ) -> Self {
        Self {
            exec_type: exec_type.into(),
            text: None,
            venue_order_id: venue_order_id.into(),
            client_order_id: client_order_id.into(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}
