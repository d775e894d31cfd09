//! Order entry over a session and a REST transport.
//!
//! A stop attached to a limit order is written to the store as provisional
//! before the order goes out, so a report racing back on the session thread
//! always finds it. A send that fails discards it again.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};
use tsh_oco::{
    ContingencyDispatcher, ContingentOrder, ContingentStore, DispatchError, MarketOrderRequest,
    OrderType,
};

use crate::{NewOrder, RestTransport, SessionTransport, TransportError};

pub struct VenueRouter {
    session: Arc<dyn SessionTransport>,
    rest: Arc<dyn RestTransport>,
    store: Arc<ContingentStore>,
}

impl VenueRouter {
    pub fn new(
        session: Arc<dyn SessionTransport>,
        rest: Arc<dyn RestTransport>,
        store: Arc<ContingentStore>,
    ) -> Self {
        Self {
            session,
            rest,
            store,
        }
    }

    pub fn session(&self) -> &Arc<dyn SessionTransport> {
        &self.session
    }

    pub fn rest(&self) -> &Arc<dyn RestTransport> {
        &self.rest
    }

    pub fn store(&self) -> &Arc<ContingentStore> {
        &self.store
    }

    /// Send `order`, optionally with a stop at `stop_price` paired to it.
    ///
    /// The stop has the limit order's product, side and quantity. Only limit
    /// orders take a stop.
    pub fn place(&self, order: &NewOrder, stop_price: Option<Decimal>) -> Result<(), TransportError> {
        if let Some(trigger) = stop_price {
            if order.order_type != OrderType::Limit {
                return Err("a stop can only be attached to a limit order".into());
            }
            if trigger <= Decimal::ZERO {
                return Err(format!("stop price must be positive, got {trigger}").into());
            }
            self.store.add_provisional(ContingentOrder::provisional(
                order.product.clone(),
                order.side,
                order.base_quantity,
                trigger,
                order.client_order_id.clone(),
            ));
        }

        if let Err(e) = self.session.send_order(order) {
            if stop_price.is_some()
                && self
                    .store
                    .discard_provisional(&order.client_order_id)
                    .is_some()
            {
                warn!(client_order_id = %order.client_order_id, "order not sent; attached stop discarded");
            }
            return Err(e);
        }

        info!(
            product = %order.product,
            side = %order.side,
            order_type = %order.order_type,
            base_quantity = %order.base_quantity,
            limit_price = ?order.limit_price,
            stop_price = ?stop_price,
            client_order_id = %order.client_order_id,
            "order sent"
        );
        Ok(())
    }
}

impl ContingencyDispatcher for VenueRouter {
    fn submit_market(&self, req: &MarketOrderRequest) -> Result<String, DispatchError> {
        let order = NewOrder::market(req.product.clone(), req.side, req.base_quantity);
        self.session.send_order(&order)?;
        Ok(order.client_order_id)
    }

    fn cancel_order(&self, venue_order_id: &str) -> Result<(), DispatchError> {
        self.rest.cancel_order(venue_order_id)
    }
}
