//! tsh-oco
//!
//! Contingent (stop) order engine.
//!
//! Three event streams meet here: price ticks drive the [`TriggerEvaluator`],
//! execution reports drive the [`ExecutionReconciler`], and the order-entry
//! path writes provisional entries. All three go through one
//! [`ContingentStore`] guarded by a single mutex.
//!
//! Guarantee: an order is removed from the confirmed set at most once, and
//! its paired dispatch (market order + cancel of the guarded limit order) is
//! issued at most once. Whichever path removes it first owns it.
//!
//! Venue I/O is behind [`ContingencyDispatcher`]; nothing in this crate
//! touches the network.

mod dispatch;
mod evaluator;
mod exec_type;
mod reconciler;
mod store;
mod types;

pub use dispatch::{ContingencyDispatcher, DispatchError, MarketOrderRequest};
pub use evaluator::{should_fire, FiredStop, TriggerEvaluator};
pub use exec_type::ExecType;
pub use reconciler::{ExecutionReconciler, Promotion, ReconcileOutcome};
pub use store::{ContingentStore, EntryId, StopOrderView, StopState};
pub use types::{ContingentOrder, ExecutionReport, OrderType, Side};
