use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tsh_oco::{OrderType, Side};

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeInForce {
    ImmediateOrCancel,
    GoodUntilCancelled,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::ImmediateOrCancel => "IMMEDIATE_OR_CANCEL",
            TimeInForce::GoodUntilCancelled => "GOOD_UNTIL_CANCELLED",
        }
    }
}

/// Order as handed to a [`crate::SessionTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub product: String,
    pub side: Side,
    pub order_type: OrderType,
    pub base_quantity: Decimal,
    /// `Some` exactly for limit orders.
    pub limit_price: Option<Decimal>,
    pub client_order_id: String,
}

impl NewOrder {
    pub fn market(product: impl Into<String>, side: Side, base_quantity: Decimal) -> Self {
        Self {
            product: product.into(),
            side,
            order_type: OrderType::Market,
            base_quantity,
            limit_price: None,
            client_order_id: new_client_order_id(),
        }
    }

    pub fn limit(
        product: impl Into<String>,
        side: Side,
        limit_price: Decimal,
        base_quantity: Decimal,
    ) -> Self {
        Self {
            product: product.into(),
            side,
            order_type: OrderType::Limit,
            base_quantity,
            limit_price: Some(limit_price),
            client_order_id: new_client_order_id(),
        }
    }

    /// Market orders are IOC, limit orders rest GTC.
    pub fn time_in_force(&self) -> TimeInForce {
        match self.order_type {
            OrderType::Market => TimeInForce::ImmediateOrCancel,
            OrderType::Limit => TimeInForce::GoodUntilCancelled,
        }
    }

    /// JSON body shared by `/order` and `/order_preview`.
    pub(crate) fn to_payload(&self, portfolio_id: &str) -> serde_json::Value {
        let mut v = serde_json::json!({
            "portfolio_id": portfolio_id,
            "product_id": self.product,
            "client_order_id": self.client_order_id,
            "side": self.side.as_str(),
            "type": self.order_type.as_str(),
            "base_quantity": self.base_quantity.to_string(),
            "time_in_force": self.time_in_force().as_str(),
        });
        if let Some(px) = self.limit_price {
            v["limit_price"] = serde_json::Value::String(px.to_string());
        }
        v
    }
}

pub fn new_client_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// REST views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Balance {
    #[serde(default)]
    pub symbol: String,
    pub amount: Decimal,
    pub holds: Decimal,
    pub withdrawable_amount: Decimal,
    #[serde(default)]
    pub fiat_amount: Decimal,
}

/// One row of an order listing. Unknown fields are kept for the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: String,
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(rename = "type", default)]
    pub order_type: Option<String>,
    #[serde(default)]
    pub limit_price: Option<String>,
    #[serde(default)]
    pub base_quantity: Option<String>,
    #[serde(default)]
    pub quote_value: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OrderPreview {
    pub base_quantity: String,
    pub quote_value: String,
    pub limit_price: String,
    pub commission: String,
    pub slippage: String,
    pub best_bid: String,
    pub best_ask: String,
    pub average_filled_price: String,
    pub order_total: String,
}

/// Two decimals, half away from zero.
pub fn format_usd(value: Decimal) -> String {
    let r = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{r:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn usd_rounds_to_cents() {
        assert_eq!(format_usd(dec!(1234.5678)), "1234.57");
        assert_eq!(format_usd(dec!(0.005)), "0.01");
        assert_eq!(format_usd(dec!(10)), "10.00");
    }

    #[test]
    fn tif_follows_order_type() {
        let m = NewOrder::market("ETH-USD", Side::Buy, dec!(1));
        let l = NewOrder::limit("ETH-USD", Side::Buy, dec!(1000), dec!(1));
        assert_eq!(m.time_in_force(), TimeInForce::ImmediateOrCancel);
        assert_eq!(l.time_in_force(), TimeInForce::GoodUntilCancelled);
        assert_ne!(m.client_order_id, l.client_order_id);
    }

    #[test]
    fn payload_has_limit_price_only_for_limits() {
        let m = NewOrder::market("ETH-USD", Side::Sell, dec!(0.5)).to_payload("pf");
        assert!(m.get("limit_price").is_none());
        assert_eq!(m["type"], "MARKET");
        assert_eq!(m["side"], "SELL");
        assert_eq!(m["base_quantity"], "0.5");

        let l = NewOrder::limit("ETH-USD", Side::Buy, dec!(1400.25), dec!(2)).to_payload("pf");
        assert_eq!(l["limit_price"], "1400.25");
        assert_eq!(l["time_in_force"], "GOOD_UNTIL_CANCELLED");
        assert_eq!(l["portfolio_id"], "pf");
    }

    #[test]
    fn order_summary_keeps_unknown_fields() {
        let raw = r#"{"id":"o-1","product_id":"ETH-USD","side":"BUY","type":"LIMIT",
            "limit_price":"1500","base_quantity":"1","quote_value":null,"status":"OPEN",
            "created_at":"2024-01-01T00:00:00Z"}"#;
        let o: OrderSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(o.order_type.as_deref(), Some("LIMIT"));
        assert!(o.quote_value.is_none());
        assert_eq!(o.extra["created_at"], "2024-01-01T00:00:00Z");
    }
}
