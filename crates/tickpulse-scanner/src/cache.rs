//! Shared in-memory metrics cache.
//!
//! One writer path per concern: scan cycles publish whole records, the
//! realtime merger overwrites only the last traded price. Readers take
//! point-in-time snapshots and never observe a half-written record.

use std::collections::HashMap;
use std::sync::Arc;

use tickpulse_core::{InstrumentToken, MetricsRecord, Symbol};

#[derive(Debug, Default)]
struct CacheInner {
    metrics: HashMap<Symbol, MetricsRecord>,
    token_to_symbol: HashMap<InstrumentToken, Symbol>,
}

impl CacheInner {
    fn publish(&mut self, record: MetricsRecord) {
        self.token_to_symbol
            .insert(record.token.clone(), record.symbol.clone());
        self.metrics.insert(record.symbol.clone(), record);
    }

    fn update_ltp(&mut self, token: &InstrumentToken, last_traded_price: f64) -> bool {
        let Some(symbol) = self.token_to_symbol.get(token) else {
            return false;
        };
        let Some(record) = self.metrics.get_mut(symbol) else {
            return false;
        };
        record.ltp = (last_traded_price * 100.0).round() / 100.0;
        true
    }

    fn snapshot(&self) -> Vec<MetricsRecord> {
        let mut records: Vec<MetricsRecord> = self.metrics.values().cloned().collect();
        records.sort_by(|a, b| {
            b.strength_score
                .total_cmp(&a.strength_score)
                .then_with(|| a.symbol.as_str().cmp(b.symbol.as_str()))
        });
        records
    }
}

/// Thread-safe symbol-keyed metrics cache with a token reverse map.
#[derive(Debug, Clone, Default)]
pub struct MarketCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one instrument's record, keeping the token reverse
    /// map in step.
    pub async fn publish(&self, record: MetricsRecord) {
        let mut inner = self.inner.write().await;
        inner.publish(record);
    }

    /// Overwrite only the last traded price for the record owning `token`.
    ///
    /// Ticks for unknown tokens are dropped; returns whether a record was
    /// updated. The price is rounded to 2 decimal places like every other
    /// price field.
    pub async fn update_ltp(&self, token: &InstrumentToken, last_traded_price: f64) -> bool {
        let mut inner = self.inner.write().await;
        inner.update_ltp(token, last_traded_price)
    }

    /// All cached records, strongest score first (ties broken by symbol).
    pub async fn snapshot(&self) -> Vec<MetricsRecord> {
        let inner = self.inner.read().await;
        inner.snapshot()
    }

    pub async fn lookup(&self, symbol: &Symbol) -> Option<MetricsRecord> {
        let inner = self.inner.read().await;
        inner.metrics.get(symbol).cloned()
    }

    pub async fn symbol_for(&self, token: &InstrumentToken) -> Option<Symbol> {
        let inner = self.inner.read().await;
        inner.token_to_symbol.get(token).cloned()
    }

    /// Every token the cache has seen, for feed subscription.
    pub async fn known_tokens(&self) -> Vec<InstrumentToken> {
        let inner = self.inner.read().await;
        inner.token_to_symbol.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.metrics.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
