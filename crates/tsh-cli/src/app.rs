//! Interactive command loop.
//!
//! # Design
//! Operator lines arrive on a channel fed by one stdin reader thread. Menus
//! consume them with `blocking_recv`; the market-data screen consumes them
//! inside `block_on` next to the feed, so `x` can end a subscription while
//! frames are still streaming. A closed channel (stdin EOF) unwinds every
//! menu back out of [`App::run`].
//!
//! All venue calls made from here are blocking and run on the caller thread,
//! which must not be a runtime worker.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tsh_book::Depth;
use tsh_broker::{format_usd, NewOrder, OrderSummary, RestTransport, VenueRouter};
use tsh_md::FeedClient;
use tsh_oco::{ContingentStore, StopState};
use tsh_risk::FatFingerValidator;

use crate::trade::{parse_trade, TradeCommand, TradeInput, HELP};
use crate::views::{
    parse_selection, parse_subscription, render_balance, render_ladder, render_orders,
    render_stop_orders, Selection, MAX_CLOSED_ROWS,
};

const LINE_SPACER: &str = "--------------------------------------------------------------------------------";

pub struct App<W: Write> {
    out: W,
    lines: mpsc::UnboundedReceiver<String>,
    router: Arc<VenueRouter>,
    validator: FatFingerValidator,
    feed: FeedClient,
    runtime: Handle,
}

impl<W: Write> App<W> {
    pub fn new(
        out: W,
        lines: mpsc::UnboundedReceiver<String>,
        router: Arc<VenueRouter>,
        validator: FatFingerValidator,
        feed: FeedClient,
        runtime: Handle,
    ) -> Self {
        Self {
            out,
            lines,
            router,
            validator,
            feed,
            runtime,
        }
    }

    fn read_line(&mut self) -> Option<String> {
        self.lines.blocking_recv().map(|l| l.trim().to_string())
    }

    fn rest(&self) -> Arc<dyn RestTransport> {
        Arc::clone(self.router.rest())
    }

    fn store(&self) -> Arc<ContingentStore> {
        Arc::clone(self.router.store())
    }

    /// Main menu. Returns on `x` or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            writeln!(self.out, "{LINE_SPACER}")?;
            writeln!(self.out, "Choose an option:")?;
            writeln!(self.out, "1. Trade input")?;
            writeln!(self.out, "2. Market data")?;
            writeln!(self.out, "3. Order manager")?;
            writeln!(self.out, "Type 'x' to quit.")?;
            self.out.flush()?;

            let Some(choice) = self.read_line() else {
                return Ok(());
            };
            let done = match choice.to_ascii_lowercase().as_str() {
                "1" => self.trade_mode()?,
                "2" => self.market_data_mode()?,
                "3" => self.order_manager_mode()?,
                "x" => {
                    writeln!(self.out, "Exiting...")?;
                    return Ok(());
                }
                _ => {
                    writeln!(self.out, "Invalid choice. Please select a valid option.")?;
                    false
                }
            };
            if done {
                return Ok(());
            }
        }
    }

    // -----------------------------------------------------------------------
    // Trade input
    // -----------------------------------------------------------------------

    /// `Ok(true)` when input ended.
    fn trade_mode(&mut self) -> Result<bool> {
        loop {
            match self.rest().fetch_balance("USD") {
                Ok(b) => writeln!(
                    self.out,
                    "USD Balance - Total: {} | Holds: {} | Available: {}",
                    format_usd(b.amount),
                    format_usd(b.holds),
                    format_usd(b.withdrawable_amount)
                )?,
                Err(e) => writeln!(self.out, "Error fetching USD balance: {e}")?,
            }
            writeln!(self.out, "Enter trade. Type 'h' for help. Type 'x' to quit.")?;
            self.out.flush()?;

            let Some(line) = self.read_line() else {
                return Ok(true);
            };
            if line.eq_ignore_ascii_case("x") {
                return Ok(false);
            }
            if line.is_empty() {
                continue;
            }

            match parse_trade(&line) {
                Ok(TradeInput::Help) => writeln!(self.out, "{HELP}")?,
                Ok(TradeInput::Order(cmd)) => {
                    if self.submit(&cmd)? {
                        return Ok(true);
                    }
                    writeln!(self.out, "{LINE_SPACER}")?;
                }
                Err(e) => writeln!(self.out, "Error: {e}")?,
            }
        }
    }

    /// `Ok(true)` when input ended during a preview prompt.
    fn submit(&mut self, cmd: &TradeCommand) -> Result<bool> {
        let decision = self.validator.check(&cmd.risk_check());
        if !decision.is_allowed() {
            writeln!(self.out, "Order rejected: {}", decision.reason)?;
            return Ok(false);
        }

        let order = cmd.to_new_order();
        if cmd.preview {
            let preview = match self.rest().preview_order(&order) {
                Ok(p) => p,
                Err(e) => {
                    writeln!(self.out, "Failed to preview order: {e}")?;
                    return Ok(false);
                }
            };
            for (k, v) in [
                ("Base Quantity", &preview.base_quantity),
                ("Quote Value", &preview.quote_value),
                ("Limit Price", &preview.limit_price),
                ("Commission", &preview.commission),
                ("Slippage", &preview.slippage),
                ("Best Bid", &preview.best_bid),
                ("Best Ask", &preview.best_ask),
                ("Average Filled Price", &preview.average_filled_price),
                ("Order Total", &preview.order_total),
            ] {
                writeln!(self.out, "{k}: {v}")?;
            }
            loop {
                writeln!(self.out, "Enter 'g' to submit order or 'x' to create a new order.")?;
                self.out.flush()?;
                let Some(answer) = self.read_line() else {
                    return Ok(true);
                };
                match answer.to_ascii_lowercase().as_str() {
                    "g" => break,
                    "x" => {
                        writeln!(self.out, "Returning to order creation...")?;
                        return Ok(false);
                    }
                    _ => writeln!(self.out, "Invalid input. Please enter 'g' or 'x'.")?,
                }
            }
        }

        self.send(&order, cmd)?;
        Ok(false)
    }

    fn send(&mut self, order: &NewOrder, cmd: &TradeCommand) -> Result<()> {
        match self.router.place(order, cmd.stop_price) {
            Ok(()) => {
                writeln!(
                    self.out,
                    "Order sent: {} {} {} {} (client order id {})",
                    order.product, order.order_type, order.side, order.base_quantity, order.client_order_id
                )?;
                if let Some(stop) = cmd.stop_price {
                    writeln!(self.out, "Stop order at {stop} attached")?;
                }
            }
            Err(e) => writeln!(self.out, "Error sending trade: {e}")?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Market data
    // -----------------------------------------------------------------------

    fn market_data_mode(&mut self) -> Result<bool> {
        loop {
            writeln!(
                self.out,
                "Enter product to subscribe to (format: BASE-QUOTE n) where n is the number of top bids/asks (1-9), or type 'x' to return to main menu:"
            )?;
            self.out.flush()?;
            let Some(line) = self.read_line() else {
                return Ok(true);
            };
            if line.eq_ignore_ascii_case("x") {
                return Ok(false);
            }
            let (product, depth) = match parse_subscription(&line) {
                Ok(v) => v,
                Err(e) => {
                    writeln!(self.out, "Invalid input: {e}")?;
                    continue;
                }
            };

            let asset = tsh_md::base_asset(&product).to_string();
            match self.rest().fetch_balance(&asset) {
                Ok(b) => writeln!(self.out, "{}", render_balance(&b))?,
                Err(e) => writeln!(self.out, "Error fetching balance for {asset}: {e}")?,
            }
            writeln!(self.out, "Type 'x' to disconnect.")?;

            if self.stream(&product, depth)? {
                return Ok(true);
            }
        }
    }

    /// Stream until the operator types `x`. `Ok(true)` when input ended.
    fn stream(&mut self, product: &str, depth: Depth) -> Result<bool> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let out = &mut self.out;
        let lines = &mut self.lines;
        let feed = &self.feed;

        let mut drawn = 0usize;
        let mut input_ended = false;
        let result = self.runtime.block_on(async {
            let run = feed.run(product, stop_rx, |ladder| {
                let rows = render_ladder(ladder, depth);
                // Redraw over the previous frame.
                if drawn > 0 {
                    let _ = write!(out, "\x1b[{drawn}A");
                }
                for r in &rows {
                    let _ = writeln!(out, "\x1b[2K{r}");
                }
                for _ in rows.len()..drawn {
                    let _ = writeln!(out, "\x1b[2K");
                }
                drawn = drawn.max(rows.len());
                let _ = out.flush();
            });
            tokio::pin!(run);
            let mut stopping = false;
            loop {
                tokio::select! {
                    res = &mut run => return res,
                    line = lines.recv(), if !stopping => match line {
                        Some(l) if l.trim().eq_ignore_ascii_case("x") => {
                            stopping = true;
                            let _ = stop_tx.send(true);
                        }
                        Some(_) => {}
                        None => {
                            input_ended = true;
                            stopping = true;
                            let _ = stop_tx.send(true);
                        }
                    },
                }
            }
        });

        match result {
            Ok(()) => info!(product = %product, "market data subscription ended"),
            Err(e) => {
                warn!(product = %product, error = %e, "market data subscription failed");
                writeln!(self.out, "Market data for {product} unavailable: {e}")?;
            }
        }
        Ok(input_ended)
    }

    // -----------------------------------------------------------------------
    // Order manager
    // -----------------------------------------------------------------------

    fn order_manager_mode(&mut self) -> Result<bool> {
        loop {
            writeln!(self.out, "{LINE_SPACER}")?;
            writeln!(self.out, "Select an option:")?;
            writeln!(self.out, "1. Manage open orders")?;
            writeln!(self.out, "2. View recent closed orders")?;
            writeln!(self.out, "3. View portfolio balances")?;
            writeln!(self.out, "4. Manage stop orders")?;
            writeln!(self.out, "Type 'x' to cancel")?;
            self.out.flush()?;

            let Some(choice) = self.read_line() else {
                return Ok(true);
            };
            let ended = match choice.to_ascii_lowercase().as_str() {
                "1" => self.open_orders()?,
                "2" => self.closed_orders()?,
                "3" => self.balances()?,
                "4" => self.stop_orders()?,
                "x" => return Ok(false),
                _ => {
                    writeln!(self.out, "Invalid choice. Please select again.")?;
                    false
                }
            };
            if ended {
                return Ok(true);
            }
        }
    }

    fn open_orders(&mut self) -> Result<bool> {
        loop {
            let orders = match self.rest().fetch_open_orders() {
                Ok(o) => o,
                Err(e) => {
                    writeln!(self.out, "Error: {e}")?;
                    return Ok(false);
                }
            };
            if orders.is_empty() {
                writeln!(self.out, "No open orders found!")?;
                return Ok(false);
            }
            write!(self.out, "{}", render_orders(&orders))?;
            writeln!(
                self.out,
                "Select an order by number, add '-c' to cancel, or type 'x' to return to previous menu:"
            )?;
            self.out.flush()?;

            let Some(line) = self.read_line() else {
                return Ok(true);
            };
            match parse_selection(&line, orders.len()) {
                Some(Selection::Back) => return Ok(false),
                Some(Selection::Cancel(i)) => self.cancel(&orders[i])?,
                Some(Selection::Inspect(i)) => {
                    let detail = serde_json::to_string_pretty(&orders[i])?;
                    writeln!(self.out, "{detail}")?;
                    loop {
                        writeln!(
                            self.out,
                            "Type 'c' to cancel the order or 'x' to go back to the order selector."
                        )?;
                        self.out.flush()?;
                        let Some(answer) = self.read_line() else {
                            return Ok(true);
                        };
                        match answer.to_ascii_lowercase().as_str() {
                            "c" => {
                                self.cancel(&orders[i])?;
                                break;
                            }
                            "x" => break,
                            _ => writeln!(self.out, "Invalid choice. Please select again.")?,
                        }
                    }
                }
                None => writeln!(self.out, "Invalid choice")?,
            }
        }
    }

    fn cancel(&mut self, order: &OrderSummary) -> Result<()> {
        match self.rest().cancel_order(&order.id) {
            Ok(()) => writeln!(self.out, "Cancel requested for {}", order.id)?,
            Err(e) => writeln!(self.out, "Failed to cancel order: {e}")?,
        }
        Ok(())
    }

    fn closed_orders(&mut self) -> Result<bool> {
        let mut orders = match self.rest().fetch_all_orders() {
            Ok(o) => o,
            Err(e) => {
                writeln!(self.out, "Error: {e}")?;
                return Ok(false);
            }
        };
        orders.retain(|o| !o.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("OPEN")));
        orders.truncate(MAX_CLOSED_ROWS);
        if orders.is_empty() {
            writeln!(self.out, "No orders found!")?;
            return Ok(false);
        }
        write!(self.out, "{}", render_orders(&orders))?;
        loop {
            writeln!(self.out, "Type 'x' to return to previous menu:")?;
            self.out.flush()?;
            match self.read_line() {
                None => return Ok(true),
                Some(l) if l.eq_ignore_ascii_case("x") => return Ok(false),
                Some(_) => writeln!(
                    self.out,
                    "Invalid choice, please type 'x' to return to previous menu."
                )?,
            }
        }
    }

    fn balances(&mut self) -> Result<bool> {
        loop {
            writeln!(self.out, "Enter an asset (e.g., 'eth') or type 'x' to cancel:")?;
            self.out.flush()?;
            let Some(asset) = self.read_line() else {
                return Ok(true);
            };
            if asset.eq_ignore_ascii_case("x") {
                return Ok(false);
            }
            if asset.is_empty() {
                writeln!(self.out, "Invalid input. Please enter a valid asset.")?;
                continue;
            }
            match self.rest().fetch_balance(&asset) {
                Ok(b) => writeln!(self.out, "{}", render_balance(&b))?,
                Err(e) => writeln!(self.out, "Error fetching balance: {e}")?,
            }
        }
    }

    fn stop_orders(&mut self) -> Result<bool> {
        let store = self.store();
        loop {
            let stops = store.list();
            if stops.is_empty() {
                writeln!(self.out, "No stop orders found!")?;
                return Ok(false);
            }
            write!(self.out, "{}", render_stop_orders(&stops))?;
            writeln!(
                self.out,
                "Select a stop order by number with '-c' to cancel, or type 'x' to return to previous menu:"
            )?;
            self.out.flush()?;

            let Some(line) = self.read_line() else {
                return Ok(true);
            };
            match parse_selection(&line, stops.len()) {
                Some(Selection::Back) => return Ok(false),
                Some(Selection::Cancel(i)) => {
                    let view = &stops[i];
                    let removed = match (view.state, view.order.venue_order_id.as_deref()) {
                        (StopState::Confirmed, Some(venue_id)) => store.remove_confirmed(venue_id),
                        _ => {
                            writeln!(
                                self.out,
                                "Stop order #{} is still waiting for its limit order to be acknowledged",
                                i + 1
                            )?;
                            continue;
                        }
                    };
                    match removed {
                        Some(o) => {
                            info!(product = %o.product, trigger = %o.trigger_price, "stop order removed by operator");
                            writeln!(self.out, "Removed stop order #{}", i + 1)?;
                        }
                        None => writeln!(self.out, "Stop order #{} is no longer pending", i + 1)?,
                    }
                }
                Some(Selection::Inspect(_)) | None => writeln!(self.out, "Invalid choice")?,
            }
        }
    }
}
