//! Indicator calculator: pure function from a daily price series to a
//! metrics record.
//!
//! No I/O, no shared state. Identical input series always yields a
//! bit-identical [`MetricsRecord`], which the scan scheduler publishes into
//! the shared cache.

use crate::{
    Breakout, BreakoutLevels, Candle, Dominance, Instrument, MacdSignal, MetricsRecord,
    PriceSeries, Sentiment,
};

/// Minimum candles needed to compute lagged percentage changes.
pub const MIN_SERIES_LEN: usize = 5;

/// RSI lookback: trailing differences of closes.
const RSI_PERIOD: usize = 14;

/// Neutral RSI substituted when fewer than [`RSI_PERIOD`] differences exist.
const RSI_NEUTRAL: f64 = 50.0;

/// Breakout lookback windows in trading sessions.
pub const BREAKOUT_WINDOWS: [usize; 6] = [1, 10, 30, 50, 100, 250];

/// Result of one indicator computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
    Ready(MetricsRecord),
    /// Series shorter than [`MIN_SERIES_LEN`]; not an error.
    InsufficientData,
}

impl Computed {
    pub fn into_record(self) -> Option<MetricsRecord> {
        match self {
            Self::Ready(record) => Some(record),
            Self::InsufficientData => None,
        }
    }
}

/// Derive the full metrics record for one instrument from its daily series.
pub fn compute_metrics(instrument: &Instrument, series: &PriceSeries) -> Computed {
    if series.len() < MIN_SERIES_LEN {
        return Computed::InsufficientData;
    }

    let closes: Vec<f64> = series.candles.iter().map(|candle| candle.close).collect();
    let last = closes.len() - 1;

    let change_current = pct_change(closes[last], closes[last - 1]);
    let change_1d = pct_change(closes[last - 1], closes[last - 2]);
    let change_2d = pct_change(closes[last - 2], closes[last - 3]);
    let change_3d = pct_change(closes[last - 3], closes[last - 4]);
    let avg_3d = mean_of_present(&[change_current, change_1d, change_2d, change_3d]);

    let dom_current = dominance(&series.candles[last]);
    let dom_1d = dominance(&series.candles[last - 1]);
    let dom_2d = dominance(&series.candles[last - 2]);
    let dom_3d = dominance(&series.candles[last - 3]);
    let avg_dom_3d = dominance_consensus(&[dom_current, dom_1d, dom_2d, dom_3d]);

    let rsi = rsi(&closes);

    let macd = MacdState::compute(&closes);
    let macd_signal = macd.label();

    let score = strength_score(rsi, &macd, change_current, dom_current);
    let sentiment = Sentiment::from_score(score);

    let [bo_1, bo_10, bo_30, bo_50, bo_100, bo_52w] =
        BREAKOUT_WINDOWS.map(|window| breakout(series, window));

    Computed::Ready(MetricsRecord {
        symbol: instrument.symbol.clone(),
        token: instrument.token.clone(),
        ltp: closes[last],
        change_pct: change_current.map(round2),
        rsi: round2(rsi),
        strength_score: round1(score),
        sentiment,
        change_current: change_current.map(round2),
        change_1d: change_1d.map(round2),
        change_2d: change_2d.map(round2),
        change_3d: change_3d.map(round2),
        avg_3d: avg_3d.map(round2),
        avg_dom_3d,
        dom_current,
        dom_1d,
        dom_2d,
        dom_3d,
        macd_signal,
        breakout_1d: bo_1.label,
        breakout_10d: bo_10.label,
        breakout_30d: bo_30.label,
        breakout_50d: bo_50.label,
        breakout_100d: bo_100.label,
        breakout_52w: bo_52w.label,
        high_1d: bo_1.high,
        low_1d: bo_1.low,
        high_10d: bo_10.high,
        low_10d: bo_10.low,
        high_30d: bo_30.high,
        low_30d: bo_30.low,
        high_50d: bo_50.high,
        low_50d: bo_50.low,
        high_100d: bo_100.high,
        low_100d: bo_100.low,
        high_52w: bo_52w.high,
        low_52w: bo_52w.low,
    })
}

/// Percentage change between two closes; absent when the base close is not a
/// usable divisor.
fn pct_change(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous * 100.0)
}

fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    if values.iter().any(Option::is_none) {
        return None;
    }
    let sum: f64 = values.iter().flatten().sum();
    Some(sum / values.len() as f64)
}

fn dominance(candle: &Candle) -> Dominance {
    if candle.close > candle.open {
        Dominance::Buyers
    } else {
        Dominance::Sellers
    }
}

/// Consensus over the last 4 sessions: >=3 buyer-dominant sessions means
/// buyers, <=1 means sellers, anything else is balance.
fn dominance_consensus(sessions: &[Dominance; 4]) -> Dominance {
    let bulls = sessions
        .iter()
        .filter(|dom| **dom == Dominance::Buyers)
        .count();

    if bulls >= 3 {
        Dominance::Buyers
    } else if bulls <= 1 {
        Dominance::Sellers
    } else {
        Dominance::Balance
    }
}

/// RSI over the trailing [`RSI_PERIOD`] close-to-close differences.
///
/// Rolling mean of gains and of losses over exactly the trailing window;
/// substitutes the neutral 50 when fewer than 14 differences exist or when
/// the window is entirely flat, rather than propagating an undefined ratio.
fn rsi(closes: &[f64]) -> f64 {
    if closes.len() < RSI_PERIOD + 1 {
        return RSI_NEUTRAL;
    }

    let window = &closes[closes.len() - (RSI_PERIOD + 1)..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            gain_sum += delta;
        } else {
            loss_sum += -delta;
        }
    }

    let avg_gain = gain_sum / RSI_PERIOD as f64;
    let avg_loss = loss_sum / RSI_PERIOD as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return RSI_NEUTRAL;
        }
        return 100.0;
    }

    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

/// Exponential moving average with span semantics (`alpha = 2 / (span + 1)`),
/// seeded from the first value with no bias adjustment.
fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = match values.first() {
        Some(first) => *first,
        None => return out,
    };
    out.push(current);

    for value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// Latest MACD line, signal line, and histogram values.
struct MacdState {
    line: f64,
    signal: f64,
    histogram: f64,
    prev_histogram: f64,
}

impl MacdState {
    fn compute(closes: &[f64]) -> Self {
        let ema12 = ema(closes, 12);
        let ema26 = ema(closes, 26);
        let macd_line: Vec<f64> = ema12
            .iter()
            .zip(&ema26)
            .map(|(fast, slow)| fast - slow)
            .collect();
        let signal_line = ema(&macd_line, 9);

        let last = macd_line.len() - 1;
        Self {
            line: macd_line[last],
            signal: signal_line[last],
            histogram: macd_line[last] - signal_line[last],
            prev_histogram: macd_line[last - 1] - signal_line[last - 1],
        }
    }

    fn label(&self) -> MacdSignal {
        if self.histogram > 0.0 {
            if self.histogram > self.prev_histogram {
                MacdSignal::BullishGrowing
            } else {
                MacdSignal::BullishWaning
            }
        } else if self.histogram < 0.0 {
            if self.histogram < self.prev_histogram {
                MacdSignal::BearishGrowing
            } else {
                MacdSignal::BearishWaning
            }
        } else {
            MacdSignal::Neutral
        }
    }
}

/// Composite strength score: additive increments on a base of 50.
///
/// Bounded to [50, 90] by construction: +10 RSI above midline, -5 overbought
/// penalty (only reachable after the +10, so the base is the floor), +15 MACD
/// line above signal, +10 positive current change, +5 buyer-dominant session.
fn strength_score(
    rsi: f64,
    macd: &MacdState,
    change_current: Option<f64>,
    dom_current: Dominance,
) -> f64 {
    let mut score = 50.0;
    if rsi > 50.0 {
        score += 10.0;
    }
    if rsi > 70.0 {
        score -= 5.0;
    }
    if macd.line > macd.signal {
        score += 15.0;
    }
    if matches!(change_current, Some(change) if change > 0.0) {
        score += 10.0;
    }
    if dom_current == Dominance::Buyers {
        score += 5.0;
    }
    score
}

/// Breakout levels for one window: max high / min low over the `window`
/// sessions strictly preceding the current one. Requires `window + 1` total
/// sessions, otherwise the reference is absent.
fn breakout(series: &PriceSeries, window: usize) -> BreakoutLevels {
    let len = series.len();
    if len < window + 1 {
        return BreakoutLevels::unavailable();
    }

    let preceding = &series.candles[len - 1 - window..len - 1];
    let high = preceding.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = preceding.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    let close = series.candles[len - 1].close;
    let label = if close > high {
        Breakout::Bullish
    } else if close < low {
        Breakout::Bearish
    } else {
        Breakout::Consolidating
    };

    BreakoutLevels {
        label,
        high: Some(high),
        low: Some(low),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
