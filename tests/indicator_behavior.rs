//! Behavior-driven tests for indicator computation
//!
//! These tests verify HOW the calculator turns a daily candle series into a
//! metrics record, focusing on rounding, label derivation, and the handling
//! of series too short for each indicator.

use tickpulse_core::{
    compute_metrics, Breakout, Candle, Computed, Dominance, Instrument, InstrumentToken,
    PriceSeries, Sentiment, Symbol, UtcDateTime, MIN_SERIES_LEN,
};

fn instrument(symbol: &str, token: &str) -> Instrument {
    Instrument::new(
        Symbol::parse(symbol).expect("valid symbol"),
        InstrumentToken::parse(token).expect("valid token"),
    )
}

/// Daily series at the given closes; every candle closes 1.0 above its open
/// with 0.5 wicks on both sides.
fn series_from_closes(closes: &[f64]) -> PriceSeries {
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(day, close)| {
            let ts = UtcDateTime::parse(&format!(
                "2023-{:02}-{:02}T00:00:00Z",
                1 + day / 28,
                1 + day % 28
            ))
            .expect("valid timestamp");
            let open = close - 1.0;
            Candle::new(ts, open, close + 0.5, open - 0.5, *close, Some(10_000))
                .expect("valid candle")
        })
        .collect();

    PriceSeries::new(Symbol::parse("SBIN").expect("valid symbol"), candles)
        .expect("chronological series")
}

// =============================================================================
// Indicator Calculator: Reference Scenario
// =============================================================================

#[tokio::test]
async fn when_six_session_series_is_computed_system_reports_expected_current_change() {
    // Given: The six-session reference series
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("six sessions are enough");

    // Then: The current change is (110 - 107) / 107 * 100, rounded to 2dp
    assert_eq!(record.change_current, Some(2.8));
    assert_eq!(record.change_pct, Some(2.8));

    // And: LTP seeds from the latest close
    assert_eq!(record.ltp, 110.0);

    // And: Lagged changes round the same way
    assert_eq!(record.change_1d, Some(1.9)); // (107-105)/105
    assert_eq!(record.change_2d, Some(3.96)); // (105-101)/101
    assert_eq!(record.change_3d, Some(-0.98)); // (101-102)/102
}

#[tokio::test]
async fn when_every_session_closes_up_system_reports_buyer_dominance_consensus() {
    // Given: A series where close > open in every session
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: Each session and the 4-session consensus are buyer-dominant
    assert_eq!(record.dom_current, Dominance::Buyers);
    assert_eq!(record.dom_1d, Dominance::Buyers);
    assert_eq!(record.dom_2d, Dominance::Buyers);
    assert_eq!(record.dom_3d, Dominance::Buyers);
    assert_eq!(record.avg_dom_3d, Dominance::Buyers);
}

// =============================================================================
// Indicator Calculator: Insufficient Data
// =============================================================================

#[tokio::test]
async fn when_series_is_below_minimum_system_reports_insufficient_data() {
    // Given: A series one session short of the minimum
    let series = series_from_closes(&[100.0, 101.0, 102.0, 103.0]);
    assert!(series.len() < MIN_SERIES_LEN);

    // When: Metrics are computed
    let computed = compute_metrics(&instrument("SBIN", "3045"), &series);

    // Then: The result is a skip, not an error and not a defaulted record
    assert_eq!(computed, Computed::InsufficientData);
    assert!(computed.into_record().is_none());
}

#[tokio::test]
async fn when_series_is_too_short_for_rsi_system_substitutes_neutral() {
    // Given: Enough sessions for changes but fewer than the 14 RSI needs
    let series = series_from_closes(&[100.0, 103.0, 99.0, 104.0, 102.0, 105.0]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: RSI is the neutral midpoint rather than an extrapolation
    assert_eq!(record.rsi, 50.0);
}

#[tokio::test]
async fn when_windows_are_unpopulated_system_leaves_breakout_levels_absent() {
    // Given: Six sessions, enough only for the 1-day breakout window
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: The 1-day window has levels, the longer windows do not
    assert!(record.high_1d.is_some());
    assert!(record.low_1d.is_some());
    assert_eq!(record.high_10d, None);
    assert_eq!(record.high_52w, None);

    // And: Unpopulated windows read as consolidating, never as a breakout
    assert_eq!(record.breakout_10d, Breakout::Consolidating);
    assert_eq!(record.breakout_52w, Breakout::Consolidating);
}

// =============================================================================
// Indicator Calculator: Breakout Semantics
// =============================================================================

#[tokio::test]
async fn when_close_clears_preceding_window_high_system_labels_bullish_breakout() {
    // Given: A final close above the previous session's high (107.5)
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: The 1-day window reports a bullish breakout over that high
    assert_eq!(record.breakout_1d, Breakout::Bullish);
    assert_eq!(record.high_1d, Some(107.5));
}

#[tokio::test]
async fn when_close_sits_inside_the_window_system_labels_consolidating() {
    // Given: A final close between the previous session's low and high
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 110.0, 109.5]);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: No breakout in either direction
    assert_eq!(record.breakout_1d, Breakout::Consolidating);
}

#[tokio::test]
async fn when_full_year_of_sessions_exists_system_populates_every_window() {
    // Given: 251 sessions, exactly enough for the 250-session window
    let closes: Vec<f64> = (0..251)
        .map(|i| 300.0 + (i as f64 * 0.17).sin() * 25.0)
        .collect();
    let series = series_from_closes(&closes);

    // When: Metrics are computed
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // Then: Every breakout window carries reference levels
    for (high, low) in [
        (record.high_1d, record.low_1d),
        (record.high_10d, record.low_10d),
        (record.high_30d, record.low_30d),
        (record.high_50d, record.low_50d),
        (record.high_100d, record.low_100d),
        (record.high_52w, record.low_52w),
    ] {
        let high = high.expect("window high");
        let low = low.expect("window low");
        assert!(high >= low, "window high must bound window low");
    }
}

// =============================================================================
// Indicator Calculator: Score and Sentiment
// =============================================================================

#[tokio::test]
async fn when_score_is_computed_system_keeps_it_within_additive_bounds() {
    // Given: Rising, falling, and oscillating regimes
    let regimes: Vec<Vec<f64>> = vec![
        (0..60).map(|i| 100.0 + i as f64).collect(),
        (0..60).map(|i| 200.0 - i as f64).collect(),
        (0..60).map(|i| 150.0 + (i as f64 * 0.9).cos() * 12.0).collect(),
    ];

    for closes in regimes {
        // When: Metrics are computed
        let record = compute_metrics(&instrument("SBIN", "3045"), &series_from_closes(&closes))
            .into_record()
            .expect("record");

        // Then: The additive score never leaves its reachable range
        assert!(
            record.strength_score >= 50.0 && record.strength_score <= 90.0,
            "score {} escaped bounds",
            record.strength_score
        );

        // And: Sentiment is consistent with the score that produced it
        assert_eq!(record.sentiment, Sentiment::from_score(record.strength_score));
    }
}

#[tokio::test]
async fn when_the_same_series_is_computed_twice_system_produces_identical_records() {
    // Given: One fixed series
    let closes: Vec<f64> = (0..280)
        .map(|i| 500.0 + (i as f64 * 0.23).sin() * 60.0)
        .collect();
    let series = series_from_closes(&closes);

    // When: The calculator runs twice
    let first = compute_metrics(&instrument("SBIN", "3045"), &series);
    let second = compute_metrics(&instrument("SBIN", "3045"), &series);

    // Then: The records are bit-identical
    assert_eq!(first, second);
}

// =============================================================================
// Indicator Calculator: Serialization Shape
// =============================================================================

#[tokio::test]
async fn when_record_is_serialized_system_emits_display_style_labels() {
    // Given: A computed record
    let series = series_from_closes(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0]);
    let record = compute_metrics(&instrument("SBIN", "3045"), &series)
        .into_record()
        .expect("record");

    // When: The record is serialized to JSON
    let json = serde_json::to_value(&record).expect("serializable");

    // Then: Labels use their display strings and identity fields are plain
    assert_eq!(json["symbol"], "SBIN");
    assert_eq!(json["token"], "3045");
    assert_eq!(json["dom_current"], "Buyers");
    let sentiment = json["sentiment"].as_str().expect("sentiment string");
    assert!(
        ["STRONG BUY", "Bullish", "Neutral", "Bearish", "STRONG SELL"].contains(&sentiment),
        "unexpected sentiment label {sentiment}"
    );
}
