//! # Tickpulse Scanner
//!
//! Scan orchestration for the tickpulse pipeline: a perpetual scheduler
//! fans out bounded-concurrency historical fetches, publishes computed
//! metrics into a shared cache, and a realtime merger keeps last traded
//! prices fresh between cycles.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Shared symbol-keyed metrics cache with token reverse map |
//! | [`config`] | Scanner runtime knobs and environment overrides |
//! | [`fetcher`] | Per-instrument fetch/compute worker with retry |
//! | [`merger`] | Realtime tick merger |
//! | [`resolver`] | Watchlist-first scan ordering |
//! | [`scheduler`] | Perpetual scan cycle state machine |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use tickpulse_core::AngelOneAdapter;
//! use tickpulse_scanner::{
//!     HistoricalFetcher, MarketCache, RealtimeMerger, ScanScheduler, ScannerConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let adapter = Arc::new(AngelOneAdapter::mock());
//!     let cache = MarketCache::new();
//!     let config = ScannerConfig::from_env();
//!
//!     let fetcher = HistoricalFetcher::new(adapter.clone(), config.lookback_days);
//!     let scheduler = ScanScheduler::new(
//!         adapter.clone(),
//!         adapter.clone(),
//!         adapter,
//!         fetcher,
//!         cache.clone(),
//!         config,
//!     );
//!
//!     let (tick_tx, tick_rx) = tokio::sync::mpsc::channel(1024);
//!     tokio::spawn(RealtimeMerger::new(cache.clone()).run(tick_rx));
//!     drop(tick_tx);
//!
//!     scheduler.run().await;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod fetcher;
pub mod merger;
pub mod resolver;
pub mod scheduler;

pub use cache::MarketCache;
pub use config::ScannerConfig;
pub use fetcher::{FetchOutcome, HistoricalFetcher};
pub use merger::RealtimeMerger;
pub use resolver::WatchlistResolver;
pub use scheduler::{CyclePhase, CycleReport, ScanScheduler};
