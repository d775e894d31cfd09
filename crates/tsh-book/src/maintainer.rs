//! Snapshot + delta maintainer for a single L2 subscription.
//!
//! Two states: `Uninitialized` until the first snapshot parses, then `Live`.
//! A snapshot that fails to parse leaves the maintainer uninitialized; the
//! subscription must not proceed. Once live, a malformed delta is logged and
//! dropped, and a delta for another channel is ignored.

use std::fmt;

use tracing::warn;

use crate::wire::{L2Message, WireLevel};
use crate::{Ladder, PriceLevel};

/// Channel tag carried by every delta on the L2 feed.
pub const L2_CHANNEL: &str = "l2_data";

#[derive(Debug)]
pub enum BookError {
    /// Payload was not a well-formed L2 message.
    Parse(serde_json::Error),
    /// `apply_update` called before a snapshot was accepted.
    NotLive,
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::Parse(e) => write!(f, "malformed l2 message: {e}"),
            BookError::NotLive => write!(f, "order book has no snapshot yet"),
        }
    }
}

impl std::error::Error for BookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BookError::Parse(e) => Some(e),
            BookError::NotLive => None,
        }
    }
}

/// What a single delta did to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// `applied` level updates were upserted; `dropped` were unusable.
    Applied { applied: usize, dropped: usize },
    /// Channel tag did not match the subscription.
    Ignored,
}

#[derive(Debug, Clone)]
enum BookState {
    Uninitialized,
    Live(Ladder),
}

#[derive(Debug, Clone)]
pub struct OrderBookMaintainer {
    channel: String,
    state: BookState,
}

impl Default for OrderBookMaintainer {
    fn default() -> Self {
        Self::new(L2_CHANNEL)
    }
}

impl OrderBookMaintainer {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            state: BookState::Uninitialized,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, BookState::Live(_))
    }

    /// The current ladder, `None` until a snapshot was accepted.
    pub fn ladder(&self) -> Option<&Ladder> {
        match &self.state {
            BookState::Live(l) => Some(l),
            BookState::Uninitialized => None,
        }
    }

    /// Drop the ladder and wait for a fresh snapshot (used on reconnect).
    pub fn reset(&mut self) {
        self.state = BookState::Uninitialized;
    }

    /// Build the ladder from a snapshot message and go live.
    pub fn init_from_snapshot(&mut self, raw: &str) -> Result<&Ladder, BookError> {
        let msg = L2Message::parse(raw).map_err(|e| {
            warn!(error = %e, "failed to parse l2 snapshot");
            BookError::Parse(e)
        })?;

        let mut ladder = Ladder::new();
        apply_all(&mut ladder, msg.updates());
        ladder.settle();

        self.state = BookState::Live(ladder);
        self.ladder().ok_or(BookError::NotLive)
    }

    /// Apply one delta message. Only valid once live.
    pub fn apply_update(&mut self, raw: &str) -> Result<UpdateOutcome, BookError> {
        let channel = &self.channel;
        let ladder = match &mut self.state {
            BookState::Live(l) => l,
            BookState::Uninitialized => return Err(BookError::NotLive),
        };

        let msg = L2Message::parse(raw).map_err(|e| {
            warn!(error = %e, "failed to parse l2 update");
            BookError::Parse(e)
        })?;

        if msg.channel != *channel {
            return Ok(UpdateOutcome::Ignored);
        }

        let (applied, dropped) = apply_all(ladder, msg.updates());
        ladder.settle();
        Ok(UpdateOutcome::Applied { applied, dropped })
    }

    /// First message initializes, every later one is a delta.
    pub fn on_message(&mut self, raw: &str) -> Result<UpdateOutcome, BookError> {
        if self.is_live() {
            return self.apply_update(raw);
        }
        let ladder = self.init_from_snapshot(raw)?;
        let applied = ladder.bids().len() + ladder.asks().len();
        Ok(UpdateOutcome::Applied {
            applied,
            dropped: 0,
        })
    }
}

fn apply_all<'a>(ladder: &mut Ladder, updates: impl Iterator<Item = &'a WireLevel>) -> (usize, usize) {
    let mut applied = 0;
    let mut dropped = 0;
    for w in updates {
        match PriceLevel::try_from(w) {
            Ok(level) => {
                ladder.apply_level(level);
                applied += 1;
            }
            Err(e) => {
                warn!(error = %e, side = %w.side, px = %w.px, "dropping l2 level update");
                dropped += 1;
            }
        }
    }
    (applied, dropped)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
