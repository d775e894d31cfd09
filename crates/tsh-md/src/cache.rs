use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::Tick;

/// Latest tick per product. Written by the price poller, read by order
/// validation. Readers may see a value up to one poll interval old.
#[derive(Debug, Default)]
pub struct PriceCache {
    inner: RwLock<HashMap<String, Tick>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, tick: Tick) {
        let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        g.insert(tick.product.clone(), tick);
    }

    pub fn get(&self, product: &str) -> Option<Tick> {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        g.get(product).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
