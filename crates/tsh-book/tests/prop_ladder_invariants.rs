//! Property tests for the ladder invariants.
//!
//! For any sequence of applied levels: after `settle`, bids are strictly
//! descending, asks strictly ascending, no zero quantities remain, and top-N
//! never exceeds `min(n, len, 9)`.

use proptest::prelude::*;
use rust_decimal::Decimal;
use tsh_book::{BookSide, Ladder, PriceLevel, MAX_DEPTH};

fn level() -> impl Strategy<Value = PriceLevel> {
    (any::<bool>(), 1u32..60, 0u32..4, 0u32..5).prop_map(|(is_bid, px, frac, qty)| {
        let side = if is_bid { BookSide::Bid } else { BookSide::Ask };
        let price = Decimal::from(px) + Decimal::new(i64::from(frac) * 25, 2);
        PriceLevel::new(side, price, Decimal::from(qty))
    })
}

proptest! {
    #[test]
    fn settle_yields_strict_order_without_zeros(levels in proptest::collection::vec(level(), 0..200)) {
        let mut ladder = Ladder::new();
        for l in levels {
            ladder.apply_level(l);
        }
        ladder.settle();

        for w in ladder.bids().windows(2) {
            prop_assert!(w[0].price > w[1].price);
        }
        for w in ladder.asks().windows(2) {
            prop_assert!(w[0].price < w[1].price);
        }
        prop_assert!(ladder.bids().iter().chain(ladder.asks()).all(|l| !l.quantity.is_zero()));
    }

    #[test]
    fn top_n_is_bounded(levels in proptest::collection::vec(level(), 0..100), n in 0usize..50) {
        let mut ladder = Ladder::new();
        for l in levels {
            ladder.apply_level(l);
        }
        ladder.settle();

        for side in [BookSide::Bid, BookSide::Ask] {
            let top = ladder.top_n(side, n);
            prop_assert!(top.len() <= n.min(ladder.len(side)));
            prop_assert!(top.len() <= MAX_DEPTH);
        }
    }

    #[test]
    fn reapplying_is_idempotent(levels in proptest::collection::vec(level(), 0..80)) {
        let mut once = Ladder::new();
        for l in &levels {
            once.apply_level(l.clone());
        }
        once.settle();

        let mut twice = once.clone();
        for l in &levels {
            twice.apply_level(l.clone());
        }
        twice.settle();

        prop_assert_eq!(once, twice);
    }
}
