//! Contingent order store.
//!
//! # Layout
//!
//! ```text
//! provisional:  client_order_id  ->  ContingentOrder   (no venue id yet)
//! confirmed:    EntryId          ->  ContingentOrder   (ordered by EntryId)
//! ```
//!
//! Confirmed entries are keyed by a monotonically assigned [`EntryId`] rather
//! than a vector index, so removing one entry never shifts another. Iteration
//! order is still insertion order, and a reverse scan matches the classic
//! "walk backwards, delete by index" pattern without its fragility.
//!
//! # Locking
//! One `std::sync::Mutex` covers both collections. The evaluator and the
//! reconciler take it through [`ContingentStore::lock`]; nothing else holds a
//! guard across I/O. A poisoned lock is recovered rather than propagated: the
//! maps are never left half-updated by any code path under the guard.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ContingentOrder;

/// Stable identity of a confirmed entry for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

#[derive(Debug, Default)]
pub(crate) struct StoreInner {
    pub(crate) provisional: HashMap<String, ContingentOrder>,
    pub(crate) confirmed: BTreeMap<EntryId, ContingentOrder>,
    next_id: u64,
}

impl StoreInner {
    /// Insert unless an entry with the same venue id is already confirmed.
    /// Returns `false` on the duplicate.
    pub(crate) fn confirm(&mut self, order: ContingentOrder) -> bool {
        if let Some(venue_id) = order.venue_order_id.as_deref() {
            if self.find_confirmed(venue_id).is_some() {
                return false;
            }
        }
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.confirmed.insert(id, order);
        true
    }

    pub(crate) fn find_confirmed(&self, venue_order_id: &str) -> Option<EntryId> {
        self.confirmed
            .iter()
            .find(|(_, o)| o.venue_order_id.as_deref() == Some(venue_order_id))
            .map(|(id, _)| *id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    Provisional,
    Confirmed,
}

/// Read-only copy of one entry, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOrderView {
    pub state: StopState,
    pub order: ContingentOrder,
}

#[derive(Debug, Default)]
pub struct ContingentStore {
    inner: Mutex<StoreInner>,
}

impl ContingentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a stop for a limit order that is about to be sent.
    ///
    /// Must be called *before* the order goes out, otherwise the first
    /// execution report can race past the insert. Re-registering the same
    /// client order id replaces the earlier entry.
    pub fn add_provisional(&self, order: ContingentOrder) {
        let mut g = self.lock();
        g.provisional.insert(order.client_order_id.clone(), order);
    }

    /// Drop a provisional entry whose order never made it to the venue.
    pub fn discard_provisional(&self, client_order_id: &str) -> Option<ContingentOrder> {
        self.lock().provisional.remove(client_order_id)
    }

    /// Confirmed entries in insertion order, followed by provisional ones.
    pub fn list(&self) -> Vec<StopOrderView> {
        let g = self.lock();
        let mut out: Vec<StopOrderView> = g
            .confirmed
            .values()
            .map(|o| StopOrderView {
                state: StopState::Confirmed,
                order: o.clone(),
            })
            .collect();
        let mut pending: Vec<&ContingentOrder> = g.provisional.values().collect();
        pending.sort_by(|a, b| a.client_order_id.cmp(&b.client_order_id));
        out.extend(pending.into_iter().map(|o| StopOrderView {
            state: StopState::Provisional,
            order: o.clone(),
        }));
        out
    }

    /// Operator removal of the confirmed entry linked to `venue_order_id`.
    /// The paired limit order is untouched. Keyed by venue id so a trigger
    /// firing between [`ContingentStore::list`] and this call cannot shift the
    /// target.
    pub fn remove_confirmed(&self, venue_order_id: &str) -> Option<ContingentOrder> {
        let mut g = self.lock();
        let id = g.find_confirmed(venue_order_id)?;
        g.confirmed.remove(&id)
    }

    pub fn confirmed_len(&self) -> usize {
        self.lock().confirmed.len()
    }

    pub fn provisional_len(&self) -> usize {
        self.lock().provisional.len()
    }

    pub fn is_empty(&self) -> bool {
        let g = self.lock();
        g.confirmed.is_empty() && g.provisional.is_empty()
    }
}
