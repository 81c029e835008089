//! Perpetual scan scheduling.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tickpulse_core::{
    ProviderError, ProviderErrorKind, RealtimeFeed, SessionProvider, UniverseSource,
};
use tracing::{debug, error, info, warn};

use crate::cache::MarketCache;
use crate::config::ScannerConfig;
use crate::fetcher::{FetchOutcome, HistoricalFetcher};
use crate::resolver::WatchlistResolver;

/// Scheduler position within its loop. Phases advance strictly in order
/// within a cycle; `Sleeping` and `Recovering` are the only two exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    EnsuringSession,
    ResolvingUniverse,
    Fetching,
    Subscribing,
    Sleeping,
    Recovering,
}

/// Outcome counts for one completed scan cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether a session was available for this cycle's fetches.
    pub session_established: bool,
    pub universe_size: usize,
    pub published: usize,
    pub insufficient: usize,
    pub failed: usize,
    /// Cache size after the cycle; grows monotonically across cycles.
    pub cache_size: usize,
    pub subscribed: bool,
    pub elapsed: Duration,
}

/// Drives the scan loop: session, universe, bounded-concurrency fetch
/// fan-out, feed subscription, then sleep.
///
/// Only a universe-resolution error pushes the scheduler into recovery.
/// Session establishment failures and per-instrument fetch failures never
/// do: the cycle proceeds, affected fetches fail fast, and the next cycle
/// re-authenticates.
pub struct ScanScheduler {
    session: Arc<dyn SessionProvider>,
    universe: Arc<dyn UniverseSource>,
    feed: Arc<dyn RealtimeFeed>,
    fetcher: HistoricalFetcher,
    resolver: WatchlistResolver,
    cache: MarketCache,
    config: ScannerConfig,
    phase: Arc<Mutex<CyclePhase>>,
}

impl ScanScheduler {
    pub fn new(
        session: Arc<dyn SessionProvider>,
        universe: Arc<dyn UniverseSource>,
        feed: Arc<dyn RealtimeFeed>,
        fetcher: HistoricalFetcher,
        cache: MarketCache,
        config: ScannerConfig,
    ) -> Self {
        let resolver = WatchlistResolver::new(config.watchlist.clone());
        Self {
            session,
            universe,
            feed,
            fetcher,
            resolver,
            cache,
            config,
            phase: Arc::new(Mutex::new(CyclePhase::Idle)),
        }
    }

    pub fn phase(&self) -> CyclePhase {
        *self.phase.lock().expect("phase lock should not be poisoned")
    }

    fn set_phase(&self, next: CyclePhase) {
        let mut phase = self.phase.lock().expect("phase lock should not be poisoned");
        debug!(from = ?*phase, to = ?next, "cycle phase transition");
        *phase = next;
    }

    /// Run scan cycles forever, sleeping `scan_interval` between successful
    /// cycles and `recovery_delay` after a cycle-fatal failure.
    pub async fn run(&self) {
        loop {
            match self.run_cycle().await {
                Ok(report) => {
                    info!(
                        universe = report.universe_size,
                        published = report.published,
                        insufficient = report.insufficient,
                        failed = report.failed,
                        cache = report.cache_size,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "scan cycle complete"
                    );
                    self.set_phase(CyclePhase::Sleeping);
                    tokio::time::sleep(self.config.scan_interval).await;
                }
                Err(cycle_error) => {
                    error!(code = cycle_error.code(), "scan cycle failed: {cycle_error}");
                    if cycle_error.kind() == ProviderErrorKind::SessionInvalid {
                        self.session.invalidate_session();
                    }
                    self.set_phase(CyclePhase::Recovering);
                    tokio::time::sleep(self.config.recovery_delay).await;
                }
            }
        }
    }

    /// One full scan cycle.
    ///
    /// # Errors
    ///
    /// Only universe resolution is cycle-fatal. A failed session
    /// establishment is logged and the cycle proceeds — the universe fetch
    /// needs no session, affected fetches fail fast, and the next cycle
    /// re-authenticates. Individual instrument failures are tallied in the
    /// report, and a subscription failure is downgraded to a warning so the
    /// cycle's published records survive.
    pub async fn run_cycle(&self) -> Result<CycleReport, ProviderError> {
        let started = Instant::now();

        self.set_phase(CyclePhase::EnsuringSession);
        let session_established = match self.session.ensure_session().await {
            Ok(_) => true,
            Err(session_error) => {
                warn!(
                    code = session_error.code(),
                    "session establishment failed, proceeding: {session_error}"
                );
                if session_error.kind() == ProviderErrorKind::SessionInvalid {
                    self.session.invalidate_session();
                }
                false
            }
        };

        self.set_phase(CyclePhase::ResolvingUniverse);
        let universe = self.universe.tradable_instruments().await?;
        let ordered = self.resolver.resolve(universe);
        if ordered.is_empty() {
            warn!("instrument universe is empty, nothing to scan");
        }

        self.set_phase(CyclePhase::Fetching);
        let universe_size = ordered.len();
        let pool_size = self.config.fetch_pool_size.max(1);

        let mut published = 0;
        let mut insufficient = 0;
        let mut failed = 0;

        let mut outcomes = stream::iter(
            ordered
                .into_iter()
                .map(|instrument| self.fetcher.fetch_and_compute(instrument)),
        )
        .buffer_unordered(pool_size);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                FetchOutcome::Published(record) => {
                    self.cache.publish(record).await;
                    published += 1;
                }
                FetchOutcome::InsufficientData { .. } => insufficient += 1,
                FetchOutcome::Failed { instrument, error } => {
                    debug!(
                        symbol = %instrument.symbol,
                        code = error.code(),
                        "instrument failed this cycle"
                    );
                    failed += 1;
                }
            }
        }

        self.set_phase(CyclePhase::Subscribing);
        let tokens = self.cache.known_tokens().await;
        let subscribed = if tokens.is_empty() {
            false
        } else {
            match self.feed.subscribe(&tokens).await {
                Ok(()) => true,
                Err(subscribe_error) => {
                    warn!(
                        code = subscribe_error.code(),
                        "feed subscription failed: {subscribe_error}"
                    );
                    false
                }
            }
        };

        let report = CycleReport {
            session_established,
            universe_size,
            published,
            insufficient,
            failed,
            cache_size: self.cache.len().await,
            subscribed,
            elapsed: started.elapsed(),
        };
        self.set_phase(CyclePhase::Idle);
        Ok(report)
    }
}
