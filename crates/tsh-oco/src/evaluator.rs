//! Trigger evaluation on price ticks.
//!
//! # Design
//! Selection and removal happen in one critical section: every confirmed entry
//! for the ticked product is visited newest-first, and the ones that fire are
//! taken out of the store before the lock is dropped. Dispatch runs afterwards
//! against entries nobody else can see any more, so a concurrent terminal
//! report for the same order finds nothing and cannot act a second time.
//!
//! Dispatch is fire-and-forget. A cancel that fails after the market order went
//! out is logged; the market order is not rolled back.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::{ContingencyDispatcher, ContingentOrder, ContingentStore, MarketOrderRequest, Side};

/// Buy stops fire at or above the trigger, sell stops at or below.
pub fn should_fire(order: &ContingentOrder, price: Decimal) -> bool {
    match order.side {
        Side::Buy => price >= order.trigger_price,
        Side::Sell => price <= order.trigger_price,
    }
}

/// One entry that fired on a tick, with what its dispatch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredStop {
    pub order: ContingentOrder,
    /// Client id of the market order, `None` if submission failed.
    pub market_client_order_id: Option<String>,
    pub cancel_ok: bool,
}

pub struct TriggerEvaluator<D> {
    store: Arc<ContingentStore>,
    dispatcher: D,
}

impl<D: ContingencyDispatcher> TriggerEvaluator<D> {
    pub fn new(store: Arc<ContingentStore>, dispatcher: D) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<ContingentStore> {
        &self.store
    }

    /// Evaluate one tick for `product`. Returns the stops that fired.
    pub fn on_tick(&self, product: &str, price: Decimal) -> Vec<FiredStop> {
        let fired = self.take_fired(product, price);
        fired.into_iter().map(|o| self.dispatch(o, price)).collect()
    }

    fn take_fired(&self, product: &str, price: Decimal) -> Vec<ContingentOrder> {
        let mut g = self.store.lock();
        let ids: Vec<_> = g
            .confirmed
            .iter()
            .rev()
            .filter(|(_, o)| o.product == product && should_fire(o, price))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| g.confirmed.remove(&id))
            .collect()
    }

    fn dispatch(&self, order: ContingentOrder, price: Decimal) -> FiredStop {
        info!(
            product = %order.product,
            side = %order.side,
            trigger = %order.trigger_price,
            price = %price,
            "stop triggered"
        );

        let req = MarketOrderRequest {
            product: order.product.clone(),
            side: order.side,
            base_quantity: order.base_quantity,
        };
        let market_client_order_id = match self.dispatcher.submit_market(&req) {
            Ok(id) => Some(id),
            Err(e) => {
                error!(product = %order.product, error = %e, "market order for triggered stop failed");
                None
            }
        };

        let cancel_ok = match order.venue_order_id.as_deref() {
            Some(venue_id) => match self.dispatcher.cancel_order(venue_id) {
                Ok(()) => true,
                Err(e) => {
                    warn!(order_id = %venue_id, error = %e, "cancel of paired limit order failed");
                    false
                }
            },
            None => false,
        };

        FiredStop {
            order,
            market_client_order_id,
            cancel_ok,
        }
    }
}
