//! Realtime tick merger.

use tickpulse_core::Tick;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::cache::MarketCache;

/// Applies live ticks to the shared cache, overwriting only the last traded
/// price. Everything else in a record stays as the last scan cycle computed
/// it.
#[derive(Debug, Clone)]
pub struct RealtimeMerger {
    cache: MarketCache,
}

impl RealtimeMerger {
    pub fn new(cache: MarketCache) -> Self {
        Self { cache }
    }

    /// Apply one tick. Ticks for tokens the cache has not seen are dropped;
    /// returns whether a record was updated.
    pub async fn apply(&self, tick: &Tick) -> bool {
        let updated = self
            .cache
            .update_ltp(&tick.token, tick.last_traded_price)
            .await;
        if updated {
            trace!(token = %tick.token, ltp = tick.last_traded_price, "tick merged");
        } else {
            debug!(token = %tick.token, "tick for unknown token dropped");
        }
        updated
    }

    /// Drain the tick channel until its senders are gone.
    ///
    /// Runs alongside scan cycles; ticks that race a cycle's publish for the
    /// same record simply take the row's write lock in arrival order.
    pub async fn run(self, mut ticks: mpsc::Receiver<Tick>) {
        while let Some(tick) = ticks.recv().await {
            self.apply(&tick).await;
        }
        debug!("tick channel closed, merger stopping");
    }
}
