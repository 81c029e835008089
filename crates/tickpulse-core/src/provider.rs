//! Provider boundary contracts.
//!
//! The scan pipeline talks to four external collaborators, each behind a
//! trait so the scanner can be driven by a real upstream adapter or a
//! deterministic test double:
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`SessionProvider`] | Establishes/refreshes the upstream session |
//! | [`HistoricalSource`] | Fetches daily candle series per instrument |
//! | [`UniverseSource`] | Lists the tradable instrument universe |
//! | [`RealtimeFeed`] | Subscribes instrument tokens to the live tick feed |
//!
//! All trait methods return boxed futures so implementations stay object
//! safe and `Send + Sync`.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{Instrument, InstrumentToken, PriceSeries, UtcDateTime, ValidationError};

/// Minimum calendar-day lookback that still guarantees enough trading
/// sessions for the 250-session breakout window.
pub const MIN_LOOKBACK_DAYS: u32 = 400;

/// Failure classification for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Upstream throttled the request; retry with backoff.
    RateLimited,
    /// Transient transport/availability failure; retry without extra delay.
    Transient,
    /// Session token rejected; re-authentication required.
    SessionInvalid,
    /// Request was malformed; retrying cannot help.
    InvalidRequest,
    /// Anything the provider response did not let us classify.
    Unclassified,
}

/// Structured provider error carrying an explicit classification.
///
/// The kind is decided from the provider's own response (status code or
/// documented error code), never by substring inspection of messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    kind: ProviderErrorKind,
    message: String,
    retryable: bool,
}

impl ProviderError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transient,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn session_invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::SessionInvalid,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unclassified(message: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Unclassified,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ProviderErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ProviderErrorKind::RateLimited => "provider.rate_limited",
            ProviderErrorKind::Transient => "provider.transient",
            ProviderErrorKind::SessionInvalid => "provider.session_invalid",
            ProviderErrorKind::InvalidRequest => "provider.invalid_request",
            ProviderErrorKind::Unclassified => "provider.unclassified",
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ProviderError {}

/// Request for one instrument's daily candle series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub instrument: Instrument,
    /// Calendar days of history to request, ending today.
    pub lookback_days: u32,
}

impl SeriesRequest {
    pub fn new(instrument: Instrument, lookback_days: u32) -> Result<Self, ValidationError> {
        if lookback_days < MIN_LOOKBACK_DAYS {
            return Err(ValidationError::LookbackTooShort {
                min: MIN_LOOKBACK_DAYS,
                got: lookback_days,
            });
        }
        Ok(Self {
            instrument,
            lookback_days,
        })
    }
}

/// Established upstream session tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub auth_token: String,
    pub feed_token: String,
    pub established_at: UtcDateTime,
}

/// One realtime tick from the live feed.
///
/// `last_traded_price` must already be denominated in the same unit as
/// historical closes; unit normalization (e.g. paise-to-rupee conversion) is
/// the feed adapter's contract, not the merger's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub token: InstrumentToken,
    pub last_traded_price: f64,
}

type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Session establishment with the upstream data provider.
pub trait SessionProvider: Send + Sync {
    /// Ensure a valid session exists, establishing one if needed.
    ///
    /// Idempotent: returns the cached session while it is still valid.
    fn ensure_session(&self) -> ProviderFuture<'_, SessionInfo>;

    /// Drop any cached session so the next `ensure_session` re-authenticates.
    fn invalidate_session(&self);
}

/// Historical daily-candle source.
pub trait HistoricalSource: Send + Sync {
    /// Fetch the instrument's recent daily series, oldest candle first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] classified per [`ProviderErrorKind`]; an
    /// empty series from the upstream is reported as `Transient` so the
    /// caller's retry budget applies.
    fn daily_series(&self, req: SeriesRequest) -> ProviderFuture<'_, PriceSeries>;
}

/// Tradable-instrument universe source.
pub trait UniverseSource: Send + Sync {
    /// List all scannable instruments. May be empty transiently at startup.
    fn tradable_instruments(&self) -> ProviderFuture<'_, Vec<Instrument>>;
}

/// Realtime tick feed control surface.
///
/// Tick delivery itself happens over a channel owned by the embedding
/// process; this trait only carries the subscription control call.
pub trait RealtimeFeed: Send + Sync {
    /// Subscribe the given tokens. Idempotent for already-subscribed tokens,
    /// so the scheduler can resubscribe a growing set every cycle.
    fn subscribe(&self, tokens: &[InstrumentToken]) -> ProviderFuture<'_, ()>;
}
