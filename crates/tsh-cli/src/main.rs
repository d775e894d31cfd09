//! `tsh` entry point.
//!
//! Loads settings, resolves credentials, wires the venue, the contingent
//! order engine and the price poller, then hands the terminal to the command
//! loop. The main thread stays outside the async runtime so blocking venue
//! calls can run on it.

mod app;
mod trade;
mod views;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tsh_broker::{
    PaperVenue, PrimeRestClient, ReconcilingSink, ReportSink, RestOrderSession, RestTransport,
    SessionTransport, VenueRouter,
};
use tsh_config::{load_settings, resolve_credentials, Credentials, Settings, VenueMode};
use tsh_md::{spawn_price_poller, FeedClient, FeedConfig, PriceCache, TickerPriceSource};
use tsh_oco::{ContingentStore, ExecutionReconciler, TriggerEvaluator};
use tsh_risk::{FatFingerConfig, FatFingerValidator};

use crate::app::App;

#[derive(Parser)]
#[command(name = "tsh")]
#[command(about = "Single-operator trading console with attached stop orders", long_about = None)]
struct Cli {
    /// Settings YAML overlaid on the built-in defaults
    config: Option<String>,
}

fn main() -> Result<()> {
    // Credentials may come from .env.local during development.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let loaded = load_settings(cli.config.as_deref())?;
    let settings = loaded.settings;
    info!(
        config_hash = %loaded.config_hash,
        mode = settings.venue.mode.as_str(),
        products = ?settings.products,
        "settings loaded"
    );
    for p in &settings.products {
        if !tsh_md::validate_product(p) {
            bail!("CONFIG_INVALID: product '{p}' is not in BASE-QUOTE format");
        }
    }

    let creds = resolve_credentials(&settings.credentials, settings.venue.mode)?;

    let store = Arc::new(ContingentStore::new());
    let sink: Arc<dyn ReportSink> = Arc::new(ReconcilingSink::new(ExecutionReconciler::new(
        Arc::clone(&store),
    )));
    let Venue {
        session,
        rest,
        sweeper,
    } = build_venue(&settings, creds.clone(), sink)?;
    session
        .connect()
        .map_err(|e| anyhow!("order session failed to start: {e}"))?;

    let router = Arc::new(VenueRouter::new(session, rest, Arc::clone(&store)));
    let evaluator = Arc::new(TriggerEvaluator::new(Arc::clone(&store), Arc::clone(&router)));
    let cache = Arc::new(PriceCache::new());
    let validator = FatFingerValidator::new(
        FatFingerConfig::new(settings.max_order_notional),
        Arc::clone(&cache),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let interval = Duration::from_secs(settings.price_poll_interval_secs);
    let (poller, sweep) = {
        let _guard = runtime.enter();
        let poller = spawn_price_poller(
            TickerPriceSource::new_with_base_url(settings.venue.ticker_base_url.clone()),
            cache,
            evaluator,
            settings.products.clone(),
            interval,
        );
        (poller, sweeper.map(|s| spawn_order_sweeper(s, interval)))
    };

    let feed = FeedClient::new(
        FeedConfig {
            ws_url: settings.venue.ws_url.clone(),
            idle_timeout: Duration::from_secs(settings.feed.idle_timeout_secs),
            reconnect_delay: Duration::from_secs(settings.feed.reconnect_delay_secs),
        },
        creds,
    );

    let lines = spawn_stdin_reader()?;
    let mut app = App::new(
        io::stdout(),
        lines,
        Arc::clone(&router),
        validator,
        feed,
        runtime.handle().clone(),
    );
    let res = app.run();

    // Tasks drop their venue handles here; `router` keeps the last one out
    // of the runtime's threads.
    poller.abort();
    if let Some(sweep) = sweep {
        sweep.abort();
    }
    runtime.shutdown_timeout(Duration::from_secs(2));
    drop(app);
    drop(router);
    info!("console closed");
    res
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();
}

struct Venue {
    session: Arc<dyn SessionTransport>,
    rest: Arc<dyn RestTransport>,
    /// Set when closing reports have to be pulled from order listings.
    sweeper: Option<Arc<RestOrderSession>>,
}

fn build_venue(
    settings: &Settings,
    creds: Credentials,
    sink: Arc<dyn ReportSink>,
) -> Result<Venue> {
    match settings.venue.mode {
        VenueMode::Paper => {
            let mut venue = PaperVenue::start(sink).context("failed to start paper venue")?;
            for (asset, amount) in &settings.paper.balances {
                venue = venue.with_balance(asset, *amount);
            }
            let venue = Arc::new(venue);
            info!("paper venue ready");
            let session: Arc<dyn SessionTransport> = venue.clone();
            let rest: Arc<dyn RestTransport> = venue;
            Ok(Venue {
                session,
                rest,
                sweeper: None,
            })
        }
        VenueMode::Prime => {
            let client = Arc::new(PrimeRestClient::new(
                settings.venue.rest_base_url.as_str(),
                settings.venue.portfolio_id.as_str(),
                creds,
            )?);
            let orders = Arc::new(RestOrderSession::new(client, sink));
            let session: Arc<dyn SessionTransport> = orders.clone();
            let rest: Arc<dyn RestTransport> = orders.clone();
            Ok(Venue {
                session,
                rest,
                sweeper: Some(orders),
            })
        }
    }
}

/// Reconcile fills and cancels the venue reports only through listings.
fn spawn_order_sweeper(orders: Arc<RestOrderSession>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let o = Arc::clone(&orders);
            match tokio::task::spawn_blocking(move || o.sweep_closed()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(error = %e, "order sweep failed"),
                Err(e) => error!(error = %e, "order sweep task failed"),
            }
        }
    })
}

/// One thread owns stdin and forwards lines until EOF.
fn spawn_stdin_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to start input thread")?;
    Ok(rx)
}
