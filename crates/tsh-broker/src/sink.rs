use tracing::{info, warn};
use tsh_oco::{ExecutionReconciler, ExecutionReport};

use crate::ReportSink;

/// Routes execution reports into the contingent order store.
#[derive(Debug, Clone)]
pub struct ReconcilingSink {
    reconciler: ExecutionReconciler,
}

impl ReconcilingSink {
    pub fn new(reconciler: ExecutionReconciler) -> Self {
        Self { reconciler }
    }
}

impl ReportSink for ReconcilingSink {
    fn on_report(&self, report: ExecutionReport) {
        self.reconciler.on_report(&report);
    }

    fn on_session_reject(&self, reason: Option<String>) {
        warn!(
            reason = reason.as_deref().unwrap_or("not returned"),
            "message rejected by venue"
        );
    }

    fn on_session_established(&self) {
        info!("order session established");
    }
}
