//! Dispatch seam for fired stops.
//!
//! Implemented by the broker adapters (session + REST). The evaluator calls it
//! only after the fired entry has left the store.

use rust_decimal::Decimal;

use crate::Side;

pub type DispatchError = Box<dyn std::error::Error + Send + Sync>;

/// Market order mirroring a fired stop's side and quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOrderRequest {
    pub product: String,
    pub side: Side,
    pub base_quantity: Decimal,
}

pub trait ContingencyDispatcher: Send + Sync {
    /// Send the market order. Returns the client order id it went out under.
    fn submit_market(&self, req: &MarketOrderRequest) -> Result<String, DispatchError>;

    /// Cancel the paired limit order by venue order id.
    fn cancel_order(&self, venue_order_id: &str) -> Result<(), DispatchError>;
}

impl<T: ContingencyDispatcher + ?Sized> ContingencyDispatcher for std::sync::Arc<T> {
    fn submit_market(&self, req: &MarketOrderRequest) -> Result<String, DispatchError> {
        (**self).submit_market(req)
    }

    fn cancel_order(&self, venue_order_id: &str) -> Result<(), DispatchError> {
        (**self).cancel_order(venue_order_id)
    }
}
