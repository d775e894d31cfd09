//! Console rendering and selection parsing. Pure string work, no I/O.

use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};
use tsh_book::{BookSide, Depth, Ladder, PriceLevel};
use tsh_broker::{format_usd, Balance, OrderSummary};
use tsh_oco::{StopOrderView, StopState};

/// Closed-order listings show at most this many rows.
pub const MAX_CLOSED_ROWS: usize = 20;

fn dash(v: Option<&str>) -> &str {
    match v {
        Some(s) if !s.is_empty() => s,
        _ => "-",
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub fn render_orders(orders: &[OrderSummary]) -> String {
    let mut out = String::from(
        "#  | Id                                   | Product | Side | Type   | Lim Px  | Base Qty| Quote Val\n",
    );
    for (i, o) in orders.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<3}| {:<37}| {:<8}| {:<5}| {:<7}| {:<8}| {:<8}| {}",
            i + 1,
            dash(Some(o.id.as_str())),
            dash(o.product_id.as_deref()),
            dash(o.side.as_deref()),
            dash(o.order_type.as_deref()),
            dash(o.limit_price.as_deref()),
            dash(o.base_quantity.as_deref()),
            dash(o.quote_value.as_deref()),
        );
    }
    out
}

/// Operator pick from a numbered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Back,
    /// 0-based row.
    Inspect(usize),
    /// 0-based row, from `N -c`.
    Cancel(usize),
}

/// `x`, `N` or `N -c` against a list of `len` rows numbered from 1.
pub fn parse_selection(input: &str, len: usize) -> Option<Selection> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("x") {
        return Some(Selection::Back);
    }
    let (num, cancel) = match input.strip_suffix("-c") {
        Some(rest) => (rest.trim(), true),
        None => (input, false),
    };
    let n: usize = num.parse().ok()?;
    if n == 0 || n > len {
        return None;
    }
    Some(if cancel {
        Selection::Cancel(n - 1)
    } else {
        Selection::Inspect(n - 1)
    })
}

// ---------------------------------------------------------------------------
// Stop orders and balances
// ---------------------------------------------------------------------------

pub fn render_stop_orders(stops: &[StopOrderView]) -> String {
    let mut out = String::from("No. | Product | Side | Amount | Stop Price | Linked Order ID\n");
    for (i, s) in stops.iter().enumerate() {
        let linked = match s.state {
            StopState::Confirmed => dash(s.order.venue_order_id.as_deref()).to_string(),
            StopState::Provisional => format!("(pending {})", s.order.client_order_id),
        };
        let _ = writeln!(
            out,
            "{}. {} | {} | {} | {} | {}",
            i + 1,
            s.order.product,
            s.order.side,
            s.order.base_quantity,
            s.order.trigger_price,
            linked
        );
    }
    out
}

/// USD amounts are shown to the cent, other assets as returned.
pub fn render_balance(b: &Balance) -> String {
    let show = |v: Decimal| {
        if b.symbol.eq_ignore_ascii_case("USD") {
            format_usd(v)
        } else {
            v.normalize().to_string()
        }
    };
    format!(
        "{} Balance - Total: {} | Holds: {} | Available: {}",
        b.symbol,
        show(b.amount),
        show(b.holds),
        show(b.withdrawable_amount)
    )
}

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// `PRODUCT N` with `N` in 1..=9.
pub fn parse_subscription(input: &str) -> Result<(String, Depth), String> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let [product, n] = parts.as_slice() else {
        return Err("expected 'PRODUCT N', e.g. 'ETH-USD 5'".to_string());
    };
    let product = product.to_ascii_uppercase();
    if !tsh_md::validate_product(&product) {
        return Err(format!("invalid product '{product}', expected BASE-QUOTE"));
    }
    let depth = n
        .parse::<usize>()
        .ok()
        .and_then(Depth::new)
        .ok_or_else(|| "number of levels must be between 1 and 9".to_string())?;
    Ok((product, depth))
}

fn two_dp(v: Decimal) -> String {
    format!(
        "{:.2}",
        v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn level_line(tag: &str, l: &PriceLevel) -> String {
    format!("{tag}: {} @ {}", two_dp(l.quantity), two_dp(l.price))
}

/// Asks above bids, best prices meeting at the spread.
pub fn render_ladder(ladder: &Ladder, depth: Depth) -> Vec<String> {
    let n = depth.get();
    let asks = ladder.top_n(BookSide::Ask, n);
    let bids = ladder.top_n(BookSide::Bid, n);
    asks.iter()
        .rev()
        .map(|l| level_line("Ask", l))
        .chain(bids.iter().map(|l| level_line("Bid", l)))
        .collect()
}
