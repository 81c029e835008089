//! # Domain Models
//!
//! Canonical domain types for the tickpulse scan pipeline.
//!
//! ## Overview
//!
//! Strongly-typed, validated, serde-ready models:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated trading symbol |
//! | [`InstrumentToken`] | Provider-assigned feed token |
//! | [`Instrument`] | Symbol/token pair identifying one scan target |
//! | [`Candle`] | One trading day's OHLCV record |
//! | [`PriceSeries`] | Chronological candle sequence for one instrument |
//! | [`MetricsRecord`] | Derived technical-analysis snapshot |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Domain types enforce invariants at construction time:
//!
//! ```rust,ignore
//! use tickpulse_core::{Candle, UtcDateTime, ValidationError};
//!
//! let ts = UtcDateTime::parse("2024-01-01T00:00:00Z")?;
//! let candle = Candle::new(ts, 100.0, 105.0, 95.0, 102.0, Some(1000))?;
//!
//! // high < low is unrepresentable
//! let invalid = Candle::new(ts, 100.0, 95.0, 105.0, 102.0, Some(1000));
//! assert!(matches!(invalid, Err(ValidationError::InvalidCandleRange)));
//! ```

mod candle;
mod metrics;
mod symbol;
mod timestamp;

pub use candle::{Candle, Instrument, PriceSeries};
pub use metrics::{
    Breakout, BreakoutLevels, Dominance, MacdSignal, MetricsRecord, Sentiment,
};
pub use symbol::{InstrumentToken, Symbol};
pub use timestamp::UtcDateTime;
