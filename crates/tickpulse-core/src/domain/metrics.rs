use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{InstrumentToken, Symbol};

/// Per-session candle dominance: did buyers or sellers drive the close.
///
/// `Balance` only appears as a multi-session consensus, never for a single
/// candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dominance {
    Buyers,
    Sellers,
    Balance,
}

impl Dominance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyers => "Buyers",
            Self::Sellers => "Sellers",
            Self::Balance => "Balance",
        }
    }
}

impl Display for Dominance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MACD histogram signal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacdSignal {
    #[serde(rename = "Bullish Growing")]
    BullishGrowing,
    #[serde(rename = "Bullish Waning")]
    BullishWaning,
    #[serde(rename = "Bearish Growing")]
    BearishGrowing,
    #[serde(rename = "Bearish Waning")]
    BearishWaning,
    Neutral,
}

impl MacdSignal {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BullishGrowing => "Bullish Growing",
            Self::BullishWaning => "Bullish Waning",
            Self::BearishGrowing => "Bearish Growing",
            Self::BearishWaning => "Bearish Waning",
            Self::Neutral => "Neutral",
        }
    }
}

impl Display for MacdSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment label derived from the composite strength score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    Bullish,
    Neutral,
    Bearish,
    #[serde(rename = "STRONG SELL")]
    StrongSell,
}

impl Sentiment {
    /// Threshold partition: (75, 100+] strong buy, (60, 75] bullish,
    /// [40, 60] neutral, [30, 40) bearish, [0, 30) strong sell.
    pub fn from_score(score: f64) -> Self {
        if score > 75.0 {
            Self::StrongBuy
        } else if score > 60.0 {
            Self::Bullish
        } else if score < 30.0 {
            Self::StrongSell
        } else if score < 40.0 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrongBuy => "STRONG BUY",
            Self::Bullish => "Bullish",
            Self::Neutral => "Neutral",
            Self::Bearish => "Bearish",
            Self::StrongSell => "STRONG SELL",
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breakout label against a preceding lookback window's high/low range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Breakout {
    #[serde(rename = "Bullish Breakout")]
    Bullish,
    #[serde(rename = "Bearish Breakout")]
    Bearish,
    Consolidating,
}

impl Breakout {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bullish => "Bullish Breakout",
            Self::Bearish => "Bearish Breakout",
            Self::Consolidating => "Consolidating",
        }
    }
}

impl Display for Breakout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference levels and label for one breakout lookback window.
///
/// `high`/`low` are `None` when the series is too short to populate the
/// window; the label is `Consolidating` in that case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutLevels {
    pub label: Breakout,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl BreakoutLevels {
    pub const fn unavailable() -> Self {
        Self {
            label: Breakout::Consolidating,
            high: None,
            low: None,
        }
    }
}

/// One instrument's current analytical snapshot.
///
/// Numeric fields are either finite or `None` ("not yet computable"); they
/// are never defaulted to a misleading number. Percentages and RSI are
/// rounded to 2 decimal places, the strength score to 1; breakout levels are
/// raw prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub symbol: Symbol,
    pub token: InstrumentToken,
    /// Last traded price. Seeded from the latest close by the scanner and
    /// kept fresh in place by the realtime merger.
    pub ltp: f64,
    pub change_pct: Option<f64>,
    pub rsi: f64,
    pub strength_score: f64,
    pub sentiment: Sentiment,
    pub change_current: Option<f64>,
    pub change_1d: Option<f64>,
    pub change_2d: Option<f64>,
    pub change_3d: Option<f64>,
    pub avg_3d: Option<f64>,
    pub avg_dom_3d: Dominance,
    pub dom_current: Dominance,
    pub dom_1d: Dominance,
    pub dom_2d: Dominance,
    pub dom_3d: Dominance,
    pub macd_signal: MacdSignal,
    pub breakout_1d: Breakout,
    pub breakout_10d: Breakout,
    pub breakout_30d: Breakout,
    pub breakout_50d: Breakout,
    pub breakout_100d: Breakout,
    pub breakout_52w: Breakout,
    pub high_1d: Option<f64>,
    pub low_1d: Option<f64>,
    pub high_10d: Option<f64>,
    pub low_10d: Option<f64>,
    pub high_30d: Option<f64>,
    pub low_30d: Option<f64>,
    pub high_50d: Option<f64>,
    pub low_50d: Option<f64>,
    pub high_100d: Option<f64>,
    pub low_100d: Option<f64>,
    pub high_52w: Option<f64>,
    pub low_52w: Option<f64>,
}
