//! Deterministic in-memory venue.
//!
//! # Design
//! - Venue order ids are `paper-{n}`, `n` counting from 1 per venue.
//! - Limit orders rest as open and report `New` (`0`).
//! - Market orders report `New` then `Fill` (`2`) immediately.
//! - Resting orders fill only through [`PaperVenue::fill`].
//! - Cancel of an open order reports `Canceled` (`4`). Unknown and closed ids
//!   are errors.
//! - Resubmitting a known `client_order_id` is idempotent: no new order, no
//!   report.
//! - Balances are fixed at construction and do not move with fills.
//!
//! Reports are queued under the same lock that mutates the order table and
//! delivered to the sink from a dedicated thread, so the sink sees them in the
//! order the venue produced them and never on the caller's stack.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use rust_decimal::Decimal;
use tracing::{debug, warn};
use tsh_oco::{ExecutionReport, OrderType, Side};

use crate::{
    Balance, NewOrder, OrderPreview, OrderSummary, ReportSink, RestError, RestTransport,
    SessionTransport, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaperStatus {
    Open,
    Filled,
    Cancelled,
}

impl PaperStatus {
    fn as_str(&self) -> &'static str {
        match self {
            PaperStatus::Open => "OPEN",
            PaperStatus::Filled => "FILLED",
            PaperStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone)]
struct PaperOrder {
    venue_order_id: String,
    client_order_id: String,
    product: String,
    side: Side,
    order_type: OrderType,
    limit_price: Option<Decimal>,
    base_quantity: Decimal,
    status: PaperStatus,
}

impl PaperOrder {
    fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.venue_order_id.clone(),
            product_id: Some(self.product.clone()),
            side: Some(self.side.as_str().to_string()),
            order_type: Some(self.order_type.as_str().to_string()),
            limit_price: self.limit_price.map(|p| p.to_string()),
            base_quantity: Some(self.base_quantity.to_string()),
            quote_value: self
                .limit_price
                .and_then(|p| p.checked_mul(self.base_quantity))
                .map(|v| v.to_string()),
            status: Some(self.status.as_str().to_string()),
            extra: serde_json::Map::from_iter([(
                "client_order_id".to_string(),
                serde_json::Value::String(self.client_order_id.clone()),
            )]),
        }
    }
}

enum Delivery {
    Established,
    Report(ExecutionReport),
    Flush(Sender<()>),
}

struct State {
    orders: BTreeMap<u64, PaperOrder>,
    by_venue_id: HashMap<String, u64>,
    by_client_id: HashMap<String, u64>,
    next_id: u64,
    balances: HashMap<String, Decimal>,
    outbox: Sender<Delivery>,
}

impl State {
    fn deliver(&self, d: Delivery) {
        if self.outbox.send(d).is_err() {
            warn!("paper report delivery thread is gone; report dropped");
        }
    }

    fn report(&self, exec_type: &str, order: &PaperOrder) {
        self.deliver(Delivery::Report(ExecutionReport::new(
            exec_type,
            order.venue_order_id.clone(),
            order.client_order_id.clone(),
        )));
    }

    fn open_order_mut(&mut self, venue_order_id: &str) -> Result<&mut PaperOrder, TransportError> {
        let id = self
            .by_venue_id
            .get(venue_order_id)
            .copied()
            .ok_or_else(|| format!("unknown order id '{venue_order_id}'"))?;
        match self.orders.get_mut(&id) {
            Some(o) if o.status == PaperStatus::Open => Ok(o),
            Some(o) => Err(format!(
                "order '{venue_order_id}' is already {}",
                o.status.as_str().to_ascii_lowercase()
            )
            .into()),
            None => Err(format!("unknown order id '{venue_order_id}'").into()),
        }
    }
}

pub struct PaperVenue {
    state: Mutex<State>,
}

impl PaperVenue {
    /// Start the venue and its delivery thread. The thread exits when the venue
    /// is dropped.
    pub fn start(sink: Arc<dyn ReportSink>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Delivery>();
        thread::Builder::new()
            .name("paper-reports".to_string())
            .spawn(move || {
                for d in rx {
                    match d {
                        Delivery::Established => sink.on_session_established(),
                        Delivery::Report(r) => sink.on_report(r),
                        Delivery::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            })?;

        Ok(Self {
            state: Mutex::new(State {
                orders: BTreeMap::new(),
                by_venue_id: HashMap::new(),
                by_client_id: HashMap::new(),
                next_id: 1,
                balances: HashMap::new(),
                outbox: tx,
            }),
        })
    }

    /// Set the balance reported for `asset`.
    pub fn with_balance(self, asset: &str, amount: Decimal) -> Self {
        self.lock()
            .balances
            .insert(asset.to_ascii_uppercase(), amount);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill a resting order completely.
    pub fn fill(&self, venue_order_id: &str) -> Result<(), TransportError> {
        let mut g = self.lock();
        let o = g.open_order_mut(venue_order_id)?;
        o.status = PaperStatus::Filled;
        let o = o.clone();
        g.report("2", &o);
        Ok(())
    }

    /// Block until every report queued so far has reached the sink.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.lock().deliver(Delivery::Flush(ack_tx));
        let _ = ack_rx.recv();
    }

    /// Venue id assigned to a client order id, if the venue has seen it.
    pub fn venue_order_id(&self, client_order_id: &str) -> Option<String> {
        let g = self.lock();
        g.by_client_id
            .get(client_order_id)
            .and_then(|id| g.orders.get(id))
            .map(|o| o.venue_order_id.clone())
    }
}

impl SessionTransport for PaperVenue {
    fn connect(&self) -> Result<(), TransportError> {
        self.lock().deliver(Delivery::Established);
        Ok(())
    }

    fn send_order(&self, order: &NewOrder) -> Result<(), TransportError> {
        if order.base_quantity <= Decimal::ZERO {
            return Err(format!("base quantity must be positive, got {}", order.base_quantity).into());
        }
        if order.order_type == OrderType::Limit && order.limit_price.is_none() {
            return Err("limit order without a limit price".into());
        }

        let mut g = self.lock();
        if g.by_client_id.contains_key(&order.client_order_id) {
            debug!(client_order_id = %order.client_order_id, "duplicate paper order ignored");
            return Ok(());
        }

        let n = g.next_id;
        g.next_id += 1;
        let mut o = PaperOrder {
            venue_order_id: format!("paper-{n}"),
            client_order_id: order.client_order_id.clone(),
            product: order.product.clone(),
            side: order.side,
            order_type: order.order_type,
            limit_price: order.limit_price,
            base_quantity: order.base_quantity,
            status: PaperStatus::Open,
        };
        g.report("0", &o);
        if o.order_type == OrderType::Market {
            o.status = PaperStatus::Filled;
            g.report("2", &o);
        }

        g.by_venue_id.insert(o.venue_order_id.clone(), n);
        g.by_client_id.insert(o.client_order_id.clone(), n);
        g.orders.insert(n, o);
        Ok(())
    }
}

impl RestTransport for PaperVenue {
    fn cancel_order(&self, venue_order_id: &str) -> Result<(), TransportError> {
        let mut g = self.lock();
        let o = g.open_order_mut(venue_order_id)?;
        o.status = PaperStatus::Cancelled;
        let o = o.clone();
        g.report("4", &o);
        Ok(())
    }

    fn fetch_balance(&self, asset: &str) -> Result<Balance, TransportError> {
        let symbol = asset.to_ascii_uppercase();
        let amount = self
            .lock()
            .balances
            .get(&symbol)
            .copied()
            .ok_or_else(|| RestError::NoBalance(symbol.clone()))?;
        Ok(Balance {
            symbol,
            amount,
            holds: Decimal::ZERO,
            withdrawable_amount: amount,
            fiat_amount: Decimal::ZERO,
        })
    }

    fn fetch_open_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        Ok(self
            .lock()
            .orders
            .values()
            .filter(|o| o.status == PaperStatus::Open)
            .map(PaperOrder::summary)
            .collect())
    }

    fn fetch_all_orders(&self) -> Result<Vec<OrderSummary>, TransportError> {
        Ok(self
            .lock()
            .orders
            .values()
            .rev()
            .map(PaperOrder::summary)
            .collect())
    }

    fn preview_order(&self, order: &NewOrder) -> Result<OrderPreview, TransportError> {
        let quote_value = order
            .limit_price
            .and_then(|p| p.checked_mul(order.base_quantity))
            .map(|v| v.to_string())
            .unwrap_or_default();
        Ok(OrderPreview {
            base_quantity: order.base_quantity.to_string(),
            limit_price: order.limit_price.map(|p| p.to_string()).unwrap_or_default(),
            commission: "0".to_string(),
            slippage: "0".to_string(),
            order_total: quote_value.clone(),
            quote_value,
            ..OrderPreview::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct Capture {
        reports: Mutex<Vec<(String, String)>>,
        established: Mutex<bool>,
    }

    impl ReportSink for Capture {
        fn on_report(&self, report: ExecutionReport) {
            self.reports
                .lock()
                .unwrap()
                .push((report.exec_type, report.venue_order_id));
        }

        fn on_session_reject(&self, _reason: Option<String>) {}

        fn on_session_established(&self) {
            *self.established.lock().unwrap() = true;
        }
    }

    fn venue() -> (PaperVenue, Arc<Capture>) {
        let sink = Arc::new(Capture::default());
        (PaperVenue::start(sink.clone()).unwrap(), sink)
    }

    fn reports(sink: &Capture) -> Vec<(String, String)> {
        sink.reports.lock().unwrap().clone()
    }

    fn pair(code: &str, id: &str) -> (String, String) {
        (code.to_string(), id.to_string())
    }

    #[test]
    fn market_order_fills_at_once() {
        let (v, sink) = venue();
        v.connect().unwrap();
        v.send_order(&NewOrder::market("ETH-USD", Side::Buy, dec!(1)))
            .unwrap();
        v.flush();

        assert!(*sink.established.lock().unwrap());
        assert_eq!(reports(&sink), vec![pair("0", "paper-1"), pair("2", "paper-1")]);
        assert!(v.fetch_open_orders().unwrap().is_empty());
    }

    #[test]
    fn limit_order_rests_until_filled_or_cancelled() {
        let (v, sink) = venue();
        let a = NewOrder::limit("ETH-USD", Side::Buy, dec!(1500), dec!(2));
        let b = NewOrder::limit("ETH-USD", Side::Sell, dec!(2500), dec!(1));
        v.send_order(&a).unwrap();
        v.send_order(&b).unwrap();

        let open = v.fetch_open_orders().unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open[0].quote_value.as_deref(), Some("3000"));

        v.fill("paper-1").unwrap();
        v.cancel_order("paper-2").unwrap();
        v.flush();

        assert_eq!(
            reports(&sink),
            vec![
                pair("0", "paper-1"),
                pair("0", "paper-2"),
                pair("2", "paper-1"),
                pair("4", "paper-2"),
            ]
        );
        let all = v.fetch_all_orders().unwrap();
        assert_eq!(all[0].id, "paper-2");
        assert_eq!(all[0].status.as_deref(), Some("CANCELLED"));
        assert_eq!(all[1].status.as_deref(), Some("FILLED"));
    }

    #[test]
    fn closed_or_unknown_cancel_fails() {
        let (v, _sink) = venue();
        v.send_order(&NewOrder::market("ETH-USD", Side::Sell, dec!(1)))
            .unwrap();
        assert!(v.cancel_order("paper-1").is_err());
        assert!(v.cancel_order("paper-99").is_err());
    }

    #[test]
    fn resubmit_is_idempotent() {
        let (v, sink) = venue();
        let o = NewOrder::limit("LTC-USD", Side::Buy, dec!(60), dec!(3));
        v.send_order(&o).unwrap();
        v.send_order(&o).unwrap();
        v.flush();

        assert_eq!(reports(&sink).len(), 1);
        assert_eq!(v.venue_order_id(&o.client_order_id).as_deref(), Some("paper-1"));
    }

    #[test]
    fn bad_quantity_is_refused() {
        let (v, sink) = venue();
        assert!(v
            .send_order(&NewOrder::market("ETH-USD", Side::Buy, dec!(0)))
            .is_err());
        v.flush();
        assert!(reports(&sink).is_empty());
    }

    #[test]
    fn balances_are_looked_up_case_insensitively() {
        let (v, _sink) = venue();
        let v = v.with_balance("usd", dec!(10000.456));
        let b = v.fetch_balance("USD").unwrap();
        assert_eq!(b.amount, dec!(10000.456));
        assert_eq!(b.withdrawable_amount, dec!(10000.456));
        assert!(v.fetch_balance("eth").is_err());
    }

    #[test]
    fn preview_prices_limit_orders() {
        let (v, _sink) = venue();
        let p = v
            .preview_order(&NewOrder::limit("ETH-USD", Side::Buy, dec!(1400), dec!(0.5)))
            .unwrap();
        assert_eq!(p.quote_value, "700.0");
        assert_eq!(p.limit_price, "1400");
    }

    #[test]
    fn oversized_quote_value_is_left_blank() {
        let (v, _sink) = venue();
        let o = NewOrder::limit("SOL-USD", Side::Buy, dec!(1000), Decimal::MAX);
        v.send_order(&o).unwrap();

        let open = v.fetch_open_orders().unwrap();
        assert_eq!(open[0].quote_value, None);
        assert_eq!(v.preview_order(&o).unwrap().quote_value, "");
    }
}
