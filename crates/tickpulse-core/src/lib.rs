//! # Tickpulse Core
//!
//! Core contracts, domain types, and indicator math for the tickpulse
//! market-data scan pipeline.
//!
//! ## Overview
//!
//! This crate provides the foundational components for tickpulse:
//!
//! - **Canonical domain models** for instruments, candles, series, and
//!   derived metrics
//! - **Provider traits** for sessions, historical candles, the instrument
//!   universe, and realtime feed subscription
//! - **Indicator calculator** turning a daily series into a metrics record
//! - **Retry and throttling policies** for upstream rate limits
//! - **HTTP client abstraction** so adapters run against reqwest or a
//!   deterministic no-op transport
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Upstream provider adapters |
//! | [`domain`] | Domain models (Instrument, Candle, PriceSeries, MetricsRecord) |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`indicators`] | Pure technical-indicator computation |
//! | [`provider`] | Provider boundary traits and error taxonomy |
//! | [`retry`] | Retry policy for fetch attempts |
//! | [`throttling`] | Upstream request-rate throttling |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tickpulse_core::{
//!     compute_metrics, AngelOneAdapter, HistoricalSource, SeriesRequest,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = AngelOneAdapter::mock();
//!     let universe = adapter.tradable_instruments().await?;
//!
//!     for instrument in universe {
//!         let request = SeriesRequest::new(instrument.clone(), 400)?;
//!         let series = adapter.daily_series(request).await?;
//!         if let Some(record) = compute_metrics(&instrument, &series).into_record() {
//!             println!("{}: score {}", record.symbol, record.strength_score);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Provider calls return [`ProviderError`] with an explicit
//! [`ProviderErrorKind`] classification, decided from the upstream's status
//! and error codes:
//!
//! ```rust
//! use tickpulse_core::{ProviderError, ProviderErrorKind};
//!
//! fn handle_error(error: ProviderError) {
//!     match error.kind() {
//!         ProviderErrorKind::RateLimited => {
//!             // Back off on the retry ladder
//!         }
//!         ProviderErrorKind::SessionInvalid => {
//!             // Re-authenticate, then retry
//!         }
//!         ProviderErrorKind::InvalidRequest => {
//!             // Report; retrying cannot help
//!         }
//!         _ => {}
//!     }
//! }
//! ```

pub mod adapters;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod indicators;
pub mod provider;
pub mod retry;
pub mod throttling;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{AngelOneAdapter, AngelOneCredentials};

// Domain models
pub use domain::{
    Breakout, BreakoutLevels, Candle, Dominance, Instrument, InstrumentToken, MacdSignal,
    MetricsRecord, PriceSeries, Sentiment, Symbol, UtcDateTime,
};

// Error types
pub use error::{CoreError, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

// Indicator computation
pub use indicators::{compute_metrics, Computed, BREAKOUT_WINDOWS, MIN_SERIES_LEN};

// Provider contracts
pub use provider::{
    HistoricalSource, ProviderError, ProviderErrorKind, RealtimeFeed, SeriesRequest, SessionInfo,
    SessionProvider, Tick, UniverseSource, MIN_LOOKBACK_DAYS,
};

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Throttling
pub use throttling::{ProviderPolicy, ThrottlingQueue};
