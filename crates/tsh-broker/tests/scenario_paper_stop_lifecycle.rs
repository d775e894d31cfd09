//! Scenario: Attached Stop Lifecycle on the Paper Venue
//!
//! # Invariant under test
//!
//! A limit order sent with a stop leaves a provisional entry that the venue's
//! `New` report confirms under the venue order id. From there exactly one of
//! two things ends the entry:
//!
//! - the limit order fills (or is cancelled) and the terminal report removes it;
//! - the stop triggers, which sends a market order and cancels the limit order.
//!
//! After either path the store is empty and no open order is left behind.

use std::sync::Arc;

use rust_decimal_macros::dec;
use tsh_broker::{NewOrder, PaperVenue, ReconcilingSink, RestTransport, SessionTransport, VenueRouter};
use tsh_oco::{ContingentStore, ExecutionReconciler, OrderType, Side, StopState, TriggerEvaluator};

struct Rig {
    store: Arc<ContingentStore>,
    venue: Arc<PaperVenue>,
    router: Arc<VenueRouter>,
    evaluator: TriggerEvaluator<Arc<VenueRouter>>,
}

fn rig() -> Rig {
    let store = Arc::new(ContingentStore::new());
    let sink = Arc::new(ReconcilingSink::new(ExecutionReconciler::new(store.clone())));
    let venue = Arc::new(PaperVenue::start(sink).unwrap());
    venue.connect().unwrap();
    let router = Arc::new(VenueRouter::new(venue.clone(), venue.clone(), store.clone()));
    let evaluator = TriggerEvaluator::new(store.clone(), router.clone());
    Rig {
        store,
        venue,
        router,
        evaluator,
    }
}

#[test]
fn triggered_stop_replaces_limit_with_market_order() {
    let r = rig();
    let limit = NewOrder::limit("ETH-USD", Side::Sell, dec!(2200), dec!(0.5));
    r.router.place(&limit, Some(dec!(1900))).unwrap();
    r.venue.flush();

    let stops = r.store.list();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].state, StopState::Confirmed);
    assert_eq!(stops[0].order.venue_order_id.as_deref(), Some("paper-1"));

    // Above the trigger: no fire for a sell stop.
    assert!(r.evaluator.on_tick("ETH-USD", dec!(1950)).is_empty());

    let fired = r.evaluator.on_tick("ETH-USD", dec!(1899.5));
    r.venue.flush();

    assert_eq!(fired.len(), 1);
    assert!(fired[0].cancel_ok);
    assert!(fired[0].market_client_order_id.is_some());
    assert!(r.store.is_empty());

    assert!(r.venue.fetch_open_orders().unwrap().is_empty());
    let all = r.venue.fetch_all_orders().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].order_type.as_deref(), Some(OrderType::Market.as_str()));
    assert_eq!(all[0].side.as_deref(), Some("SELL"));
    assert_eq!(all[0].base_quantity.as_deref(), Some("0.5"));
    assert_eq!(all[1].status.as_deref(), Some("CANCELLED"));

    // The entry is gone: a further breach does nothing.
    assert!(r.evaluator.on_tick("ETH-USD", dec!(1800)).is_empty());
}

#[test]
fn fill_of_the_limit_order_retires_the_stop() {
    let r = rig();
    let limit = NewOrder::limit("LTC-USD", Side::Buy, dec!(60), dec!(3));
    r.router.place(&limit, Some(dec!(70))).unwrap();
    r.venue.flush();
    assert_eq!(r.store.confirmed_len(), 1);

    r.venue.fill("paper-1").unwrap();
    r.venue.flush();

    assert!(r.store.is_empty());
    assert!(r.evaluator.on_tick("LTC-USD", dec!(75)).is_empty());
    assert_eq!(r.venue.fetch_all_orders().unwrap().len(), 1);
}

#[test]
fn operator_cancel_of_the_limit_order_retires_the_stop() {
    let r = rig();
    let limit = NewOrder::limit("ETH-USD", Side::Buy, dec!(1400), dec!(1));
    r.router.place(&limit, Some(dec!(1600))).unwrap();
    r.venue.flush();

    r.router.rest().cancel_order("paper-1").unwrap();
    r.venue.flush();

    assert!(r.store.is_empty());
}
