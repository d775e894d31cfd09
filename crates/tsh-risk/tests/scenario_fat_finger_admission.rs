//! Scenario: Fat-Finger Admission Against The Price Cache
//!
//! # Invariant under test
//!
//! With the default 50 000 notional cap and 5% band, an order is admitted
//! only when the cached touch makes it sane. Products missing from the cache
//! are admitted unchecked. A rejection never depends on binary floating point:
//! prices one cent past the band edge are caught exactly.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tsh_md::{PriceCache, Tick};
use tsh_oco::{OrderType, Side};
use tsh_risk::{FatFingerConfig, FatFingerValidator, OrderCheck, ReasonCode, RiskAction};

fn validator() -> (Arc<PriceCache>, FatFingerValidator) {
    let cache = Arc::new(PriceCache::new());
    cache.update(Tick {
        product: "ETH-USD".to_string(),
        bid: dec!(2500.10),
        ask: dec!(2500.30),
        price: dec!(2500.20),
        received_at: Utc::now(),
    });
    let v = FatFingerValidator::new(FatFingerConfig::new(dec!(50000)), cache.clone());
    (cache, v)
}

fn order(product: &str, side: Side, order_type: OrderType, px: Option<Decimal>, qty: Decimal) -> OrderCheck {
    OrderCheck {
        product: product.to_string(),
        side,
        order_type,
        limit_price: px,
        base_quantity: qty,
    }
}

#[test]
fn notional_at_cap_passes_above_cap_fails() {
    let (_cache, v) = validator();
    // 2500.10 * 19.99 = 49976.999 < 50000
    let ok = order("ETH-USD", Side::Buy, OrderType::Market, None, dec!(19.99));
    assert!(v.check(&ok).is_allowed());

    // 2500.10 * 20 = 50002 > 50000
    let too_big = order("ETH-USD", Side::Buy, OrderType::Market, None, dec!(20));
    let d = v.check(&too_big);
    assert_eq!(d.action, RiskAction::Reject);
    assert!(matches!(d.reason, ReasonCode::NotionalExceeded { .. }));
}

#[test]
fn buy_limit_one_cent_through_band_is_rejected() {
    let (_cache, v) = validator();
    // bid 2500.10 * 1.05 = 2625.105
    let at_edge = order("ETH-USD", Side::Buy, OrderType::Limit, Some(dec!(2625.10)), dec!(1));
    assert!(v.check(&at_edge).is_allowed());

    let through = order("ETH-USD", Side::Buy, OrderType::Limit, Some(dec!(2625.11)), dec!(1));
    assert_eq!(
        v.check(&through).reason,
        ReasonCode::PriceDeviation {
            limit: dec!(2625.11),
            band_edge: dec!(2625.105)
        }
    );
}

#[test]
fn sell_limit_far_below_ask_is_rejected() {
    let (_cache, v) = validator();
    // ask 2500.30 * 0.95 = 2375.285
    let d = v.check(&order("ETH-USD", Side::Sell, OrderType::Limit, Some(dec!(2300)), dec!(1)));
    assert_eq!(d.action, RiskAction::Reject);
}

#[test]
fn uncovered_product_is_allowed() {
    let (_cache, v) = validator();
    let d = v.check(&order("SOL-USD", Side::Buy, OrderType::Limit, Some(dec!(1000000)), dec!(1000)));
    assert!(d.is_allowed());
    assert_eq!(d.reason, ReasonCode::NotCovered);
}

#[test]
fn quantity_at_decimal_max_is_rejected_not_overflowed() {
    let (_cache, v) = validator();
    let d = v.check(&order("ETH-USD", Side::Buy, OrderType::Market, None, Decimal::MAX));
    assert_eq!(d.action, RiskAction::Reject);
    assert_eq!(
        d.reason,
        ReasonCode::NotionalExceeded {
            notional: Decimal::MAX,
            max: dec!(50000)
        }
    );

    let d = v.check(&order("ETH-USD", Side::Sell, OrderType::Limit, Some(dec!(2500)), Decimal::MAX));
    assert_eq!(d.action, RiskAction::Reject);
}
