//! Timer-driven price polling.
//!
//! Products are fetched one after another on each round. Every successful
//! fetch refreshes the [`PriceCache`] first and then runs the trigger
//! evaluator for that product. Evaluation may dispatch blocking venue calls,
//! so it runs on the blocking pool.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tsh_oco::{ContingencyDispatcher, TriggerEvaluator};

use crate::{PriceCache, PriceSource};

/// One polling round over `products`. Returns how many ticks were fetched.
pub async fn poll_once<S, D>(
    source: &S,
    cache: &PriceCache,
    evaluator: &Arc<TriggerEvaluator<D>>,
    products: &[String],
) -> usize
where
    S: PriceSource + ?Sized,
    D: ContingencyDispatcher + 'static,
{
    let mut fetched = 0;
    for product in products {
        let tick = match source.fetch_tick(product).await {
            Ok(t) => t,
            Err(e) => {
                warn!(product = %product, error = %e, "price fetch failed");
                continue;
            }
        };
        fetched += 1;
        debug!(product = %product, bid = %tick.bid, ask = %tick.ask, price = %tick.price, "tick");

        let price = tick.price;
        cache.update(tick);

        let ev = Arc::clone(evaluator);
        let p = product.clone();
        match tokio::task::spawn_blocking(move || ev.on_tick(&p, price)).await {
            Ok(fired) if !fired.is_empty() => {
                info!(product = %product, fired = fired.len(), "stop orders triggered");
            }
            Ok(_) => {}
            Err(e) => error!(product = %product, error = %e, "trigger evaluation task failed"),
        }
    }
    fetched
}

/// Poll immediately, then every `interval`, until the runtime shuts down.
pub fn spawn_price_poller<S, D>(
    source: S,
    cache: Arc<PriceCache>,
    evaluator: Arc<TriggerEvaluator<D>>,
    products: Vec<String>,
    interval: Duration,
) -> JoinHandle<()>
where
    S: PriceSource + 'static,
    D: ContingencyDispatcher + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            poll_once(&source, &cache, &evaluator, &products).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PriceSourceError, Tick};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tsh_oco::{
        ContingentOrder, ContingentStore, DispatchError, ExecutionReconciler, ExecutionReport,
        MarketOrderRequest, Side,
    };

    struct FixedPrices(HashMap<String, Decimal>);

    #[async_trait::async_trait]
    impl PriceSource for FixedPrices {
        async fn fetch_tick(&self, product: &str) -> Result<Tick, PriceSourceError> {
            let price = self
                .0
                .get(product)
                .copied()
                .ok_or_else(|| PriceSourceError::Transport("unreachable".to_string()))?;
            Ok(Tick {
                product: product.to_string(),
                bid: price - dec!(1),
                ask: price + dec!(1),
                price,
                received_at: Utc::now(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<MarketOrderRequest>>);

    impl ContingencyDispatcher for Recorder {
        fn submit_market(&self, req: &MarketOrderRequest) -> Result<String, DispatchError> {
            self.0.lock().unwrap().push(req.clone());
            Ok("m".to_string())
        }

        fn cancel_order(&self, _venue_order_id: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn round_refreshes_cache_and_triggers() {
        let store = Arc::new(ContingentStore::new());
        store.add_provisional(ContingentOrder::provisional(
            "ETH-USD",
            Side::Sell,
            dec!(1),
            dec!(2000),
            "cl",
        ));
        ExecutionReconciler::new(store.clone()).on_report(&ExecutionReport::new("0", "v", "cl"));

        let rec = Arc::new(Recorder::default());
        let evaluator = Arc::new(TriggerEvaluator::new(store.clone(), rec.clone()));
        let cache = PriceCache::new();
        let source = FixedPrices(HashMap::from([("ETH-USD".to_string(), dec!(1990))]));
        let products = vec!["ETH-USD".to_string(), "LTC-USD".to_string()];

        let fetched = poll_once(&source, &cache, &evaluator, &products).await;

        assert_eq!(fetched, 1);
        assert_eq!(cache.get("ETH-USD").map(|t| t.bid), Some(dec!(1989)));
        assert!(cache.get("LTC-USD").is_none());
        assert_eq!(store.confirmed_len(), 0);
        assert_eq!(rec.0.lock().unwrap().len(), 1);
    }
}
