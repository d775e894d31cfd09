//! Order session over the REST `/order` endpoint.
//!
//! The venue answers a create with its order id. That answer is turned into a
//! `New` execution report for the sink so attached stop orders are confirmed
//! the same way a streaming session would confirm them.
//!
//! The REST venue pushes nothing back, so closing reports are produced here:
//! - a cancel the venue accepts reports `Canceled` (`4`);
//! - [`RestOrderSession::sweep_closed`] reports `Fill` (`2`) or `Canceled`
//!   once for every order this session placed that the venue lists as closed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};
use tsh_oco::ExecutionReport;

use crate::{
    Balance, NewOrder, OrderPreview, OrderSummary, PrimeRestClient, ReportSink, RestTransport,
    SessionTransport, TransportError,
};

/// Exec type for a closed venue status, if it is one.
fn closing_exec_type(status: &str) -> Option<&'static str> {
    match status.to_ascii_uppercase().as_str() {
        "FILLED" => Some("2"),
        "CANCELLED" | "CANCELED" | "EXPIRED" | "FAILED" => Some("4"),
        _ => None,
    }
}

pub struct RestOrderSession {
    client: Arc<PrimeRestClient>,
    sink: Arc<dyn ReportSink>,
    /// venue order id -> client order id, for orders not yet reported closed.
    working: Mutex<HashMap<String, String>>,
}

impl RestOrderSession {
    pub fn new(client: Arc<PrimeRestClient>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            client,
            sink,
            working: Mutex::new(HashMap::new()),
        }
    }

    fn working(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.working.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Report `exec_type` for `venue_order_id` unless it was already closed.
    fn close(&self, exec_type: &str, venue_order_id: &str) -> bool {
        let Some(client_order_id) = self.working().remove(venue_order_id) else {
            return false;
        };
        self.sink.on_report(ExecutionReport::new(
            exec_type,
            venue_order_id.to_string(),
            client_order_id,
        ));
        true
    }

    /// Orders placed by this session that are still considered working.
    pub fn working_len(&self) -> usize {
        self.working().len()
    }

    /// List the venue's orders and report every closed one this session
    /// placed. Returns how many were reported.
    pub fn sweep_closed(&self) -> Result<usize, TransportError> {
        if self.working().is_empty() {
            return Ok(0);
        }
        let orders = self.client.all_orders()?;
        let mut closed = 0;
        for o in &orders {
            let Some(exec_type) = o.status.as_deref().and_then(closing_exec_type) else {
                continue;
            };
            if self.close(exec_type, &o.id) {
                closed += 1;
            }
        }
        if closed > 0 {
            debug!(closed, "closed orders reconciled from order listing");
        }
        Ok(closed)
    }
}

impl SessionTransport for RestOrderSession {
    fn connect(&self) -> Result<(), TransportError> {
        // Stateless: a successful open-orders call proves the credentials work.
        let open = self.client.open_orders()?;
        info!(
            portfolio_id = self.client.portfolio_id(),
            open_orders = open.len(),
            "rest order session ready"
        );
        self.sink.on_session_established();
        Ok(())
    }

    fn send_order(&self, order: &NewOrder) -> Result<(), TransportError> {
        let venue_order_id = self.client.create_order(order)?;
        info!(
            product = %order.product,
            side = %order.side,
            order_type = %order.order_type,
            client_order_id = %order.client_order_id,
            order_id = %venue_order_id,
            "order accepted"
        );
        self.working()
            .insert(venue_order_id.clone(), order.client_order_id.clone());
        self.sink.on_report(ExecutionReport::new(
            "0",
            venue_order_id,
            order.client_order_id.clone(),
        ));
        Ok(())
    }
}

impl RestTransport for RestOrderSession {
    fn cancel_order(&self, venue_order_id: &str) -> Result<(), TransportError> {
        self.client.cancel(venue_order_id)?;
        if !self.close("4", venue_order_id) {
            // Not placed by this session; a stop paired to it still closes.
            self.sink.on_report(ExecutionReport::new(
                "4",
                venue_order_id.to_string(),
                String::new(),
            ));
        }
        Ok(())
    }

    fn fetch_balance(&self, asset: &str) -> Result<Balance, TransportError> {
        self.client.fetch_balance(asset)
    }

    fn fetch_open_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        self.client.fetch_open_orders()
    }

    fn fetch_all_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        self.client.fetch_all_orders()
    }

    fn preview_order(&self, order: &NewOrder) -> Result<OrderPreview, TransportError> {
        self.client.preview_order(order)
    }
}
