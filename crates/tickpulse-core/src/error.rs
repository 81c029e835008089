use thiserror::Error;

/// Validation and contract errors exposed by `tickpulse-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("instrument token cannot be empty")]
    EmptyToken,
    #[error("instrument token must be numeric: '{value}'")]
    TokenNotNumeric { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("candle high must be >= low")]
    InvalidCandleRange,
    #[error("candle open/close must be within high/low range")]
    InvalidCandleBounds,

    #[error("price series must be chronological: candle {index} is not after its predecessor")]
    SeriesNotChronological { index: usize },

    #[error("lookback window must cover at least {min} calendar days, got {got}")]
    LookbackTooShort { min: u32, got: u32 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
