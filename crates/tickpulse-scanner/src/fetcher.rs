//! Per-instrument historical fetch and compute worker.

use std::sync::Arc;

use tickpulse_core::{
    compute_metrics, Computed, HistoricalSource, Instrument, MetricsRecord, ProviderError,
    ProviderPolicy, RetryPolicy, SeriesRequest, ThrottlingQueue,
};
use tracing::{debug, warn};

/// Terminal result of one instrument's fetch attempt chain.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Metrics computed and ready for the cache.
    Published(MetricsRecord),
    /// Series shorter than the calculator's minimum; not a failure.
    InsufficientData { instrument: Instrument },
    /// Retry budget exhausted or the failure kind rules retries out.
    Failed {
        instrument: Instrument,
        error: ProviderError,
    },
}

/// Fetches one instrument's daily series and computes its metrics record,
/// retrying per the policy and respecting the shared rate-limit queue.
///
/// Cloneable so every worker in the scan fan-out shares the same throttle
/// state.
#[derive(Clone)]
pub struct HistoricalFetcher {
    source: Arc<dyn HistoricalSource>,
    retry: RetryPolicy,
    throttle: ThrottlingQueue,
    lookback_days: u32,
}

impl HistoricalFetcher {
    pub fn new(source: Arc<dyn HistoricalSource>, lookback_days: u32) -> Self {
        Self {
            source,
            retry: RetryPolicy::default(),
            throttle: ThrottlingQueue::new(&ProviderPolicy::upstream_default()),
            lookback_days,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_throttle(mut self, throttle: ThrottlingQueue) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fetch the instrument's series and compute its record.
    ///
    /// Never propagates an error: every failure mode collapses into a
    /// [`FetchOutcome`] so one bad instrument cannot abort the cycle that
    /// spawned it.
    pub async fn fetch_and_compute(&self, instrument: Instrument) -> FetchOutcome {
        let request = match SeriesRequest::new(instrument.clone(), self.lookback_days) {
            Ok(request) => request,
            Err(error) => {
                return FetchOutcome::Failed {
                    instrument,
                    error: ProviderError::invalid_request(error.to_string()),
                }
            }
        };

        let mut attempt = 1;
        loop {
            self.acquire_slot().await;

            match self.source.daily_series(request.clone()).await {
                Ok(series) => {
                    return match compute_metrics(&instrument, &series) {
                        Computed::Ready(record) => FetchOutcome::Published(record),
                        Computed::InsufficientData => {
                            debug!(
                                symbol = %instrument.symbol,
                                sessions = series.len(),
                                "series too short to compute metrics"
                            );
                            FetchOutcome::InsufficientData { instrument }
                        }
                    };
                }
                Err(error) => match self.retry.delay_for(error.kind(), attempt) {
                    Some(delay) => {
                        warn!(
                            symbol = %instrument.symbol,
                            attempt,
                            code = error.code(),
                            "fetch failed, retrying after {delay:?}"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(
                            symbol = %instrument.symbol,
                            attempt,
                            code = error.code(),
                            "fetch failed, giving up"
                        );
                        return FetchOutcome::Failed { instrument, error };
                    }
                },
            }
        }
    }

    /// Wait until the shared throttle grants a request slot.
    async fn acquire_slot(&self) {
        let Err(first_delay) = self.throttle.acquire() else {
            return;
        };

        let mut delay = first_delay;
        loop {
            tokio::time::sleep(delay).await;
            if self.throttle.reacquire() {
                return;
            }
            delay = self.throttle.register_retry().unwrap_or(first_delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::time::Duration;

    use tickpulse_core::{
        Backoff, Candle, InstrumentToken, PriceSeries, Symbol, UtcDateTime,
    };

    struct ScriptedSource {
        script: Mutex<VecDeque<Result<PriceSeries, ProviderError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Result<PriceSeries, ProviderError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("call counter")
        }
    }

    impl HistoricalSource for ScriptedSource {
        fn daily_series(
            &self,
            _req: SeriesRequest,
        ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, ProviderError>> + Send + '_>> {
            *self.calls.lock().expect("call counter") += 1;
            let next = self
                .script
                .lock()
                .expect("script")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::unclassified("script exhausted")));
            Box::pin(async move { next })
        }
    }

    fn instrument() -> Instrument {
        Instrument::new(
            Symbol::parse("SBIN").expect("symbol"),
            InstrumentToken::parse("3045").expect("token"),
        )
    }

    fn series(closes: &[f64]) -> PriceSeries {
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(index, &close)| {
                let ts = UtcDateTime::parse(&format!("2024-01-{:02}T00:00:00Z", index + 1))
                    .expect("timestamp");
                Candle::new(ts, close - 1.0, close + 2.0, close - 2.0, close, Some(1_000))
                    .expect("candle")
            })
            .collect();
        PriceSeries::new(Symbol::parse("SBIN").expect("symbol"), candles).expect("series")
    }

    fn fetcher(source: Arc<ScriptedSource>) -> HistoricalFetcher {
        // Wide-open throttle and short delays so retry paths run fast.
        let throttle = ThrottlingQueue::new(&tickpulse_core::ProviderPolicy {
            quota_window: Duration::from_secs(1),
            quota_limit: 10_000,
            retry_backoff: Backoff::Fixed {
                delay: Duration::from_millis(1),
            },
            max_backoff: Duration::from_millis(10),
        });
        let retry = RetryPolicy {
            max_attempts: 3,
            rate_limit_backoff: Backoff::Fixed {
                delay: Duration::from_millis(1),
            },
            transient_delay: Duration::from_millis(1),
        };
        HistoricalFetcher::new(source, 400)
            .with_retry_policy(retry)
            .with_throttle(throttle)
    }

    #[tokio::test]
    async fn successful_fetch_publishes_a_record() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(series(&[
            100.0, 102.0, 101.0, 105.0, 107.0, 110.0,
        ]))]));
        let outcome = fetcher(source.clone()).fetch_and_compute(instrument()).await;

        match outcome {
            FetchOutcome::Published(record) => {
                assert_eq!(record.symbol.as_str(), "SBIN");
                assert_eq!(record.ltp, 110.0);
            }
            other => panic!("expected Published, got {other:?}"),
        }
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(ProviderError::transient("blip")),
            Ok(series(&[100.0, 102.0, 101.0, 105.0, 107.0, 110.0])),
        ]));
        let outcome = fetcher(source.clone()).fetch_and_compute(instrument()).await;

        assert!(matches!(outcome, FetchOutcome::Published(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_fails_the_instrument() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(ProviderError::rate_limited("throttled")),
            Err(ProviderError::rate_limited("throttled")),
            Err(ProviderError::rate_limited("throttled")),
        ]));
        let outcome = fetcher(source.clone()).fetch_and_compute(instrument()).await;

        match outcome {
            FetchOutcome::Failed { error, .. } => {
                assert_eq!(error.code(), "provider.rate_limited");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn unretryable_failure_stops_after_one_attempt() {
        let source = Arc::new(ScriptedSource::new(vec![Err(
            ProviderError::invalid_request("bad token"),
        )]));
        let outcome = fetcher(source.clone()).fetch_and_compute(instrument()).await;

        assert!(matches!(outcome, FetchOutcome::Failed { .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn short_series_is_insufficient_not_failed() {
        let source = Arc::new(ScriptedSource::new(vec![Ok(series(&[
            100.0, 102.0, 101.0,
        ]))]));
        let outcome = fetcher(source).fetch_and_compute(instrument()).await;

        assert!(matches!(outcome, FetchOutcome::InsufficientData { .. }));
    }
}
