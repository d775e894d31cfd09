//! Price-level ladder.
//!
//! Two ordered sequences of [`PriceLevel`]: bids descending, asks ascending,
//! so index 0 is always the touch on both sides.
//!
//! # Invariants (after [`Ladder::settle`])
//! - no two levels on the same side share a price
//! - no level carries a zero quantity
//!
//! Upserts are a linear scan over tens of levels.

use std::fmt;

use rust_decimal::Decimal;

/// Hard ceiling on top-N queries. The console never renders deeper than this.
pub const MAX_DEPTH: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookSide {
    Bid,
    Ask,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bid => write!(f, "bid"),
            BookSide::Ask => write!(f, "ask"),
        }
    }
}

/// One price level. Identity is `(side, price)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevel {
    pub side: BookSide,
    pub price: Decimal,
    pub quantity: Decimal,
}

impl PriceLevel {
    pub fn new(side: BookSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            side,
            price,
            quantity,
        }
    }

    /// `true` when this level is a removal marker.
    pub fn is_closed(&self) -> bool {
        self.quantity.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Depth
// ---------------------------------------------------------------------------

/// Validated top-N depth (1..=[`MAX_DEPTH`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth(usize);

impl Depth {
    /// Returns `None` outside 1..=9.
    pub fn new(n: usize) -> Option<Self> {
        if (1..=MAX_DEPTH).contains(&n) {
            Some(Self(n))
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Ladder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ladder {
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
}

impl Ladder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert by `(side, price)`.
    ///
    /// A matching price has its quantity replaced in place; otherwise the
    /// level is appended. Zero quantities are stored as-is and dropped by
    /// [`Ladder::remove_zero_quantity`], so a zero for an unknown price is a
    /// no-op once the ladder settles.
    pub fn apply_level(&mut self, level: PriceLevel) {
        let side = self.side_mut(level.side);
        match side.iter_mut().find(|l| l.price == level.price) {
            Some(existing) => existing.quantity = level.quantity,
            None => side.push(level),
        }
    }

    pub fn remove_zero_quantity(&mut self) {
        self.bids.retain(|l| !l.is_closed());
        self.asks.retain(|l| !l.is_closed());
    }

    /// Bids descending, asks ascending. `sort_by` is stable, so equal prices
    /// (impossible while the upsert invariant holds) keep insertion order.
    pub fn sort(&mut self) {
        self.bids.sort_by(|a, b| b.price.cmp(&a.price));
        self.asks.sort_by(|a, b| a.price.cmp(&b.price));
    }

    /// `remove_zero_quantity` followed by `sort`.
    pub fn settle(&mut self) {
        self.remove_zero_quantity();
        self.sort();
    }

    /// First `min(n, len, MAX_DEPTH)` levels of `side`, best price first.
    pub fn top_n(&self, side: BookSide, n: usize) -> &[PriceLevel] {
        let levels = self.side(side);
        let take = n.min(MAX_DEPTH).min(levels.len());
        &levels[..take]
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    pub fn best_bid(&self) -> Option<&PriceLevel> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&PriceLevel> {
        self.asks.first()
    }

    pub fn len(&self, side: BookSide) -> usize {
        self.side(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    fn side(&self, side: BookSide) -> &[PriceLevel] {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut Vec<PriceLevel> {
        match side {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bid(px: Decimal, qty: Decimal) -> PriceLevel {
        PriceLevel::new(BookSide::Bid, px, qty)
    }

    fn ask(px: Decimal, qty: Decimal) -> PriceLevel {
        PriceLevel::new(BookSide::Ask, px, qty)
    }

    #[test]
    fn upsert_replaces_quantity_in_place() {
        let mut l = Ladder::new();
        l.apply_level(bid(dec!(100), dec!(2)));
        l.apply_level(bid(dec!(100), dec!(5)));
        assert_eq!(l.bids(), &[bid(dec!(100), dec!(5))]);
    }

    #[test]
    fn textually_distinct_equal_prices_are_one_level() {
        let mut l = Ladder::new();
        l.apply_level(ask(dec!(101.50), dec!(1)));
        l.apply_level(ask(dec!(101.5), dec!(3)));
        assert_eq!(l.len(BookSide::Ask), 1);
        assert_eq!(l.asks()[0].quantity, dec!(3));
    }

    #[test]
    fn sort_orders_bids_down_and_asks_up() {
        let mut l = Ladder::new();
        for px in [dec!(99), dec!(101), dec!(100)] {
            l.apply_level(bid(px, dec!(1)));
            l.apply_level(ask(px + dec!(10), dec!(1)));
        }
        l.sort();
        let bids: Vec<_> = l.bids().iter().map(|x| x.price).collect();
        let asks: Vec<_> = l.asks().iter().map(|x| x.price).collect();
        assert_eq!(bids, vec![dec!(101), dec!(100), dec!(99)]);
        assert_eq!(asks, vec![dec!(109), dec!(110), dec!(111)]);
    }

    #[test]
    fn zero_quantity_removes_existing_level() {
        let mut l = Ladder::new();
        l.apply_level(bid(dec!(100), dec!(2)));
        l.apply_level(bid(dec!(100), dec!(0)));
        l.settle();
        assert!(l.bids().is_empty());
    }

    #[test]
    fn zero_quantity_for_unknown_price_is_noop() {
        let mut l = Ladder::new();
        l.apply_level(bid(dec!(100), dec!(2)));
        l.apply_level(bid(dec!(98), dec!(0)));
        l.settle();
        assert_eq!(l.bids(), &[bid(dec!(100), dec!(2))]);
    }

    #[test]
    fn tiny_non_zero_quantity_is_kept() {
        let mut l = Ladder::new();
        l.apply_level(ask(dec!(101), dec!(0.00000001)));
        l.settle();
        assert_eq!(l.len(BookSide::Ask), 1);
    }

    #[test]
    fn top_n_is_bounded_by_len_and_max_depth() {
        let mut l = Ladder::new();
        for i in 0..20u32 {
            l.apply_level(ask(Decimal::from(100 + i), dec!(1)));
        }
        l.sort();
        assert_eq!(l.top_n(BookSide::Ask, 3).len(), 3);
        assert_eq!(l.top_n(BookSide::Ask, 50).len(), MAX_DEPTH);
        assert_eq!(l.top_n(BookSide::Bid, 5).len(), 0);
        assert_eq!(l.top_n(BookSide::Ask, 1)[0].price, dec!(100));
    }

    #[test]
    fn depth_accepts_only_one_through_nine() {
        assert!(Depth::new(0).is_none());
        assert_eq!(Depth::new(1).map(Depth::get), Some(1));
        assert_eq!(Depth::new(9).map(Depth::get), Some(9));
        assert!(Depth::new(10).is_none());
    }
}
