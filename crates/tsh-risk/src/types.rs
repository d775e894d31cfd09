use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tsh_oco::{OrderType, Side};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FatFingerConfig {
    pub max_notional: Decimal,
    /// Buy limits above `bid x buy_band` are rejected.
    pub buy_band: Decimal,
    /// Sell limits below `ask x sell_band` are rejected.
    pub sell_band: Decimal,
}

impl FatFingerConfig {
    pub fn new(max_notional: Decimal) -> Self {
        Self {
            max_notional,
            buy_band: dec!(1.05),
            sell_band: dec!(0.95),
        }
    }
}

/// The order being asked about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderCheck {
    pub product: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Required for limit orders, ignored for market orders.
    pub limit_price: Option<Decimal>,
    pub base_quantity: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskAction {
    Allow,
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReasonCode {
    Allowed,
    /// No cached price; allowed without checks.
    NotCovered,
    NotionalExceeded { notional: Decimal, max: Decimal },
    PriceDeviation { limit: Decimal, band_edge: Decimal },
    MissingLimitPrice,
    /// Zero or negative quantity or price.
    BadInput,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasonCode::Allowed => write!(f, "allowed"),
            ReasonCode::NotCovered => {
                write!(f, "product not covered by fat finger protection")
            }
            ReasonCode::NotionalExceeded { notional, max } => {
                write!(f, "order size {notional} exceeds the max order size {max}")
            }
            ReasonCode::PriceDeviation { limit, band_edge } => write!(
                f,
                "limit price {limit} deviates more than 5% from the touch (limit edge {band_edge})"
            ),
            ReasonCode::MissingLimitPrice => write!(f, "limit order without a limit price"),
            ReasonCode::BadInput => write!(f, "quantity and price must be positive"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskDecision {
    pub action: RiskAction,
    pub reason: ReasonCode,
}

impl RiskDecision {
    pub fn allow(reason: ReasonCode) -> Self {
        Self {
            action: RiskAction::Allow,
            reason,
        }
    }

    pub fn reject(reason: ReasonCode) -> Self {
        Self {
            action: RiskAction::Reject,
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.action == RiskAction::Allow
    }
}
