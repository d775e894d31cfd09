//! Transport contracts.
//!
//! Implementations must be `Send + Sync`: the session is driven from the
//! command loop and from the price poller's blocking tasks, and reports are
//! delivered on the transport's own thread.

use tsh_oco::ExecutionReport;

use crate::{Balance, NewOrder, OrderPreview, OrderSummary};

pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of asynchronous session events.
pub trait ReportSink: Send + Sync {
    /// Execution report for an order this console sent, in arrival order.
    fn on_report(&self, report: ExecutionReport);

    /// Session-level reject of a message we sent.
    fn on_session_reject(&self, reason: Option<String>);

    /// Called once per successful logon.
    fn on_session_established(&self);
}

pub trait SessionTransport: Send + Sync {
    /// Establish the session. The sink hears `on_session_established` once it
    /// is up.
    fn connect(&self) -> Result<(), TransportError>;

    /// Send a new order. Acceptance arrives later as a report.
    fn send_order(&self, order: &NewOrder) -> Result<(), TransportError>;
}

pub trait RestTransport: Send + Sync {
    fn cancel_order(&self, venue_order_id: &str) -> Result<(), TransportError>;

    fn fetch_balance(&self, asset: &str) -> Result<Balance, TransportError>;

    fn fetch_open_orders(&self) -> Result<Vec<OrderSummary>, TransportError>;

    /// Recent orders in any state, newest first.
    fn fetch_all_orders(&self) -> Result<Vec<OrderSummary>, TransportError>;

    fn preview_order(&self, order: &NewOrder) -> Result<OrderPreview, TransportError>;
}
