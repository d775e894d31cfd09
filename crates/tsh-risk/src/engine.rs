use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;
use tsh_md::{PriceCache, Tick};
use tsh_oco::{OrderType, Side};

use crate::{FatFingerConfig, OrderCheck, ReasonCode, RiskDecision};

/// Evaluate one order against the last cached tick for its product.
pub fn evaluate(cfg: &FatFingerConfig, tick: Option<&Tick>, order: &OrderCheck) -> RiskDecision {
    if order.base_quantity <= Decimal::ZERO {
        return RiskDecision::reject(ReasonCode::BadInput);
    }
    let limit = match (order.order_type, order.limit_price) {
        (OrderType::Limit, None) => return RiskDecision::reject(ReasonCode::MissingLimitPrice),
        (OrderType::Limit, Some(p)) if p <= Decimal::ZERO => {
            return RiskDecision::reject(ReasonCode::BadInput)
        }
        (OrderType::Limit, Some(p)) => Some(p),
        (OrderType::Market, _) => None,
    };

    let Some(tick) = tick else {
        return RiskDecision::allow(ReasonCode::NotCovered);
    };

    let (best, band) = match order.side {
        Side::Buy => (tick.bid, cfg.buy_band),
        Side::Sell => (tick.ask, cfg.sell_band),
    };

    // A notional past Decimal::MAX is over any cap.
    let notional = best
        .checked_mul(order.base_quantity)
        .unwrap_or(Decimal::MAX);
    if notional > cfg.max_notional {
        return RiskDecision::reject(ReasonCode::NotionalExceeded {
            notional,
            max: cfg.max_notional,
        });
    }

    if let Some(limit) = limit {
        let Some(band_edge) = best.checked_mul(band) else {
            return RiskDecision::allow(ReasonCode::Allowed);
        };
        let through = match order.side {
            Side::Buy => limit > band_edge,
            Side::Sell => limit < band_edge,
        };
        if through {
            return RiskDecision::reject(ReasonCode::PriceDeviation { limit, band_edge });
        }
    }

    RiskDecision::allow(ReasonCode::Allowed)
}

/// [`evaluate`] bound to the shared price cache.
#[derive(Debug, Clone)]
pub struct FatFingerValidator {
    cfg: FatFingerConfig,
    cache: Arc<PriceCache>,
}

impl FatFingerValidator {
    pub fn new(cfg: FatFingerConfig, cache: Arc<PriceCache>) -> Self {
        Self { cfg, cache }
    }

    pub fn check(&self, order: &OrderCheck) -> RiskDecision {
        let tick = self.cache.get(&order.product);
        let decision = evaluate(&self.cfg, tick.as_ref(), order);
        match &decision.reason {
            ReasonCode::NotCovered => warn!(
                product = %order.product,
                "product not covered by fat finger protection; add it to settings.products"
            ),
            ReasonCode::Allowed => {}
            reason => warn!(product = %order.product, side = %order.side, reason = %reason, "order rejected"),
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RiskAction;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn tick(bid: Decimal, ask: Decimal) -> Tick {
        Tick {
            product: "ETH-USD".to_string(),
            bid,
            ask,
            price: bid,
            received_at: Utc::now(),
        }
    }

    fn limit(side: Side, px: Decimal, qty: Decimal) -> OrderCheck {
        OrderCheck {
            product: "ETH-USD".to_string(),
            side,
            order_type: OrderType::Limit,
            limit_price: Some(px),
            base_quantity: qty,
        }
    }

    #[test]
    fn non_positive_quantity_is_bad_input() {
        let cfg = FatFingerConfig::new(dec!(50000));
        let d = evaluate(&cfg, None, &limit(Side::Buy, dec!(1), dec!(0)));
        assert_eq!(d.reason, ReasonCode::BadInput);
        assert_eq!(d.action, RiskAction::Reject);
    }

    #[test]
    fn limit_without_price_is_rejected() {
        let cfg = FatFingerConfig::new(dec!(50000));
        let mut o = limit(Side::Sell, dec!(1), dec!(1));
        o.limit_price = None;
        assert_eq!(evaluate(&cfg, None, &o).reason, ReasonCode::MissingLimitPrice);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let cfg = FatFingerConfig::new(dec!(50000));
        let t = tick(dec!(2000), dec!(2000));
        // 2000 * 1.05 = 2100, 2000 * 0.95 = 1900
        assert!(evaluate(&cfg, Some(&t), &limit(Side::Buy, dec!(2100), dec!(1))).is_allowed());
        assert!(!evaluate(&cfg, Some(&t), &limit(Side::Buy, dec!(2100.01), dec!(1))).is_allowed());
        assert!(evaluate(&cfg, Some(&t), &limit(Side::Sell, dec!(1900), dec!(1))).is_allowed());
        assert!(!evaluate(&cfg, Some(&t), &limit(Side::Sell, dec!(1899.99), dec!(1))).is_allowed());
    }

    #[test]
    fn buy_checks_against_bid_sell_against_ask() {
        let cfg = FatFingerConfig::new(dec!(1000));
        let t = tick(dec!(99), dec!(101));
        let buy = OrderCheck {
            order_type: OrderType::Market,
            limit_price: None,
            ..limit(Side::Buy, dec!(0), dec!(10))
        };
        // 99 * 10 = 990 fits, 101 * 10 = 1010 does not.
        assert!(evaluate(&cfg, Some(&t), &buy).is_allowed());
        let sell = OrderCheck {
            side: Side::Sell,
            ..buy.clone()
        };
        assert_eq!(
            evaluate(&cfg, Some(&t), &sell).reason,
            ReasonCode::NotionalExceeded {
                notional: dec!(1010),
                max: dec!(1000)
            }
        );
    }

    #[test]
    fn validator_reads_cache() {
        let cache = Arc::new(PriceCache::new());
        let v = FatFingerValidator::new(FatFingerConfig::new(dec!(50000)), cache.clone());
        let o = limit(Side::Buy, dec!(5000), dec!(1));

        assert_eq!(v.check(&o).reason, ReasonCode::NotCovered);

        cache.update(tick(dec!(2000), dec!(2001)));
        assert!(matches!(
            v.check(&o).reason,
            ReasonCode::PriceDeviation { .. }
        ));
    }
}
