use serde::{Deserialize, Serialize};

use crate::{InstrumentToken, Symbol, UtcDateTime, ValidationError};

/// One scannable instrument: symbol plus the provider-assigned token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub token: InstrumentToken,
}

impl Instrument {
    pub fn new(symbol: Symbol, token: InstrumentToken) -> Self {
        Self { symbol, token }
    }
}

/// One trading day's OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: UtcDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Candle {
    pub fn new(
        ts: UtcDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidCandleRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidCandleBounds);
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Chronological daily candle sequence for one instrument.
///
/// Owned by a single fetch task for the duration of one computation and
/// discarded afterwards; the cache holds derived metrics, never raw series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    pub candles: Vec<Candle>,
}

impl PriceSeries {
    /// Build a series, enforcing strictly increasing candle timestamps.
    pub fn new(symbol: Symbol, candles: Vec<Candle>) -> Result<Self, ValidationError> {
        for (index, pair) in candles.windows(2).enumerate() {
            if pair[1].ts <= pair[0].ts {
                return Err(ValidationError::SeriesNotChronological { index: index + 1 });
            }
        }

        Ok(Self { symbol, candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candle `n` sessions back from the most recent one (0 = latest).
    pub fn nth_back(&self, n: usize) -> Option<&Candle> {
        let len = self.candles.len();
        if n >= len {
            return None;
        }
        self.candles.get(len - 1 - n)
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
