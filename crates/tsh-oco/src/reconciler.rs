//! Execution report reconciliation.
//!
//! Runs on the session's report callback. Promotion and removal for one report
//! happen under a single acquisition of the store lock; logging happens after
//! it is released.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{ContingentOrder, ContingentStore, ExecType, ExecutionReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// Provisional entry moved into the confirmed set.
    Promoted,
    /// Provisional entry dropped; an entry with this venue id was already confirmed.
    AlreadyConfirmed,
}

/// What one report did to the store. Both fields `None` means it was ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub exec_type: ExecType,
    pub promotion: Option<Promotion>,
    pub removed: Option<ContingentOrder>,
}

impl ReconcileOutcome {
    pub fn is_ignored(&self) -> bool {
        self.promotion.is_none() && self.removed.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionReconciler {
    store: Arc<ContingentStore>,
}

impl ExecutionReconciler {
    pub fn new(store: Arc<ContingentStore>) -> Self {
        Self { store }
    }

    pub fn on_report(&self, report: &ExecutionReport) -> ReconcileOutcome {
        let exec_type = ExecType::from_code(&report.exec_type);

        let (promotion, removed) = {
            let mut g = self.store.lock();

            let promotion = g.provisional.remove(&report.client_order_id).map(|mut o| {
                o.venue_order_id = Some(report.venue_order_id.clone());
                if g.confirm(o) {
                    Promotion::Promoted
                } else {
                    Promotion::AlreadyConfirmed
                }
            });

            let removed = if exec_type.is_terminal() {
                g.find_confirmed(&report.venue_order_id)
                    .and_then(|id| g.confirmed.remove(&id))
            } else {
                None
            };

            (promotion, removed)
        };

        info!(
            exec_type = exec_type.code().unwrap_or(report.exec_type.as_str()),
            status = %exec_type,
            reason = report.text.as_deref().unwrap_or(""),
            order_id = %report.venue_order_id,
            "execution report"
        );
        match (&promotion, &removed) {
            (Some(p), _) => debug!(client_order_id = %report.client_order_id, promotion = ?p, "stop order reconciled"),
            (None, None) => debug!(client_order_id = %report.client_order_id, "report does not match a stop order"),
            _ => {}
        }
        if removed.is_some() {
            info!(order_id = %report.venue_order_id, "paired order closed, stop order removed");
        }

        ReconcileOutcome {
            exec_type,
            promotion,
            removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Side;
    use rust_decimal_macros::dec;

    fn store_with_provisional(client_id: &str) -> Arc<ContingentStore> {
        let store = Arc::new(ContingentStore::new());
        store.add_provisional(ContingentOrder::provisional(
            "ETH-USD",
            Side::Sell,
            dec!(0.5),
            dec!(1800),
            client_id,
        ));
        store
    }

    #[test]
    fn new_report_promotes_provisional() {
        let store = store_with_provisional("cl-1");
        let rec = ExecutionReconciler::new(store.clone());

        let out = rec.on_report(&ExecutionReport::new("0", "v-1", "cl-1"));
        assert_eq!(out.exec_type, ExecType::New);
        assert_eq!(out.promotion, Some(Promotion::Promoted));
        assert!(out.removed.is_none());
        assert_eq!(store.provisional_len(), 0);

        let list = store.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].order.venue_order_id.as_deref(), Some("v-1"));
    }

    #[test]
    fn duplicate_venue_id_is_not_promoted_twice() {
        let store = store_with_provisional("cl-1");
        let rec = ExecutionReconciler::new(store.clone());
        rec.on_report(&ExecutionReport::new("0", "v-1", "cl-1"));

        store.add_provisional(ContingentOrder::provisional(
            "ETH-USD",
            Side::Sell,
            dec!(0.5),
            dec!(1800),
            "cl-1",
        ));
        let out = rec.on_report(&ExecutionReport::new("1", "v-1", "cl-1"));
        assert_eq!(out.promotion, Some(Promotion::AlreadyConfirmed));
        assert_eq!(store.confirmed_len(), 1);
        assert_eq!(store.provisional_len(), 0);
    }

    #[test]
    fn fill_removes_confirmed_entry() {
        let store = store_with_provisional("cl-1");
        let rec = ExecutionReconciler::new(store.clone());
        rec.on_report(&ExecutionReport::new("0", "v-1", "cl-1"));

        let out = rec.on_report(&ExecutionReport::new("2", "v-1", "cl-1"));
        assert_eq!(out.exec_type, ExecType::Fill);
        assert!(out.promotion.is_none());
        assert_eq!(
            out.removed.and_then(|o| o.venue_order_id),
            Some("v-1".to_string())
        );
        assert!(store.is_empty());
    }

    #[test]
    fn immediate_fill_promotes_and_removes() {
        let store = store_with_provisional("cl-1");
        let rec = ExecutionReconciler::new(store.clone());

        let out = rec.on_report(&ExecutionReport::new("2", "v-1", "cl-1"));
        assert_eq!(out.promotion, Some(Promotion::Promoted));
        assert!(out.removed.is_some());
        assert!(store.is_empty());
    }

    #[test]
    fn non_terminal_reports_keep_entry() {
        let store = store_with_provisional("cl-1");
        let rec = ExecutionReconciler::new(store.clone());
        rec.on_report(&ExecutionReport::new("0", "v-1", "cl-1"));

        for code in ["1", "8", "C", "Q"] {
            let out = rec.on_report(&ExecutionReport::new(code, "v-1", "cl-1").with_text("x"));
            assert!(out.is_ignored(), "code {code}");
        }
        assert_eq!(store.confirmed_len(), 1);
    }

    #[test]
    fn unknown_order_is_ignored() {
        let store = Arc::new(ContingentStore::new());
        let rec = ExecutionReconciler::new(store.clone());
        let out = rec.on_report(&ExecutionReport::new("4", "elsewhere", "not-ours"));
        assert_eq!(out.exec_type, ExecType::Canceled);
        assert!(out.is_ignored());
    }
}
