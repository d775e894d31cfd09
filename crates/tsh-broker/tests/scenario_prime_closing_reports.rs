//! Scenario: Closing Reports on the REST Venue
//!
//! # Invariant under test
//!
//! The REST venue only answers requests, so nothing but the order session can
//! tell the reconciler that a paired limit order is gone. A stop confirmed
//! against a limit order must be removed when:
//!
//! - the operator cancels that limit order and the venue accepts the cancel;
//! - the venue lists that limit order as filled on the next sweep.
//!
//! Each closed order is reported once; later sweeps report nothing.

use std::sync::Arc;

use httpmock::prelude::*;
use rust_decimal_macros::dec;
use tsh_broker::{
    NewOrder, PrimeRestClient, ReconcilingSink, RestOrderSession, RestTransport, VenueRouter,
};
use tsh_config::Credentials;
use tsh_oco::{ContingentStore, ExecutionReconciler, Side, StopState};

struct Rig {
    store: Arc<ContingentStore>,
    session: Arc<RestOrderSession>,
    router: VenueRouter,
}

fn rig(server: &MockServer) -> Rig {
    let store = Arc::new(ContingentStore::new());
    let sink = Arc::new(ReconcilingSink::new(ExecutionReconciler::new(store.clone())));
    let client = Arc::new(
        PrimeRestClient::new(server.base_url(), "pf", Credentials::new("a", "s", "p", "i"))
            .unwrap(),
    );
    let session = Arc::new(RestOrderSession::new(client, sink));
    let router = VenueRouter::new(session.clone(), session.clone(), store.clone());
    Rig {
        store,
        session,
        router,
    }
}

fn accept_orders(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/v1/portfolios/pf/order");
        then.status(200).body(r#"{"order_id":"v-1"}"#);
    });
}

fn place_with_stop(r: &Rig) {
    let limit = NewOrder::limit("ETH-USD", Side::Buy, dec!(1500), dec!(0.5));
    r.router.place(&limit, Some(dec!(1600))).unwrap();

    let stops = r.store.list();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0].state, StopState::Confirmed);
    assert_eq!(stops[0].order.venue_order_id.as_deref(), Some("v-1"));
}

#[test]
fn operator_cancel_of_paired_limit_removes_stop() {
    let server = MockServer::start();
    accept_orders(&server);
    let cancel = server.mock(|when, then| {
        when.method(POST).path("/v1/portfolios/pf/orders/v-1/cancel");
        then.status(200).body("{}");
    });
    let r = rig(&server);
    place_with_stop(&r);

    r.router.rest().cancel_order("v-1").unwrap();

    cancel.assert();
    assert!(r.store.is_empty());
    assert_eq!(r.session.working_len(), 0);
}

#[test]
fn refused_cancel_keeps_stop() {
    let server = MockServer::start();
    accept_orders(&server);
    server.mock(|when, then| {
        when.method(POST).path("/v1/portfolios/pf/orders/v-1/cancel");
        then.status(404).body("order not found");
    });
    let r = rig(&server);
    place_with_stop(&r);

    assert!(r.router.rest().cancel_order("v-1").is_err());
    assert_eq!(r.store.confirmed_len(), 1);
}

#[test]
fn sweep_reports_venue_fill_once() {
    let server = MockServer::start();
    accept_orders(&server);
    server.mock(|when, then| {
        when.method(GET).path("/v1/portfolios/pf/orders");
        then.status(200).body(
            r#"{"orders":[
                {"id":"v-1","product_id":"ETH-USD","side":"BUY","status":"FILLED"},
                {"id":"v-0","product_id":"ETH-USD","side":"SELL","status":"CANCELLED"}
            ]}"#,
        );
    });
    let r = rig(&server);
    place_with_stop(&r);

    assert_eq!(r.session.sweep_closed().unwrap(), 1);
    assert!(r.store.is_empty());
    assert_eq!(r.session.sweep_closed().unwrap(), 0);
}
