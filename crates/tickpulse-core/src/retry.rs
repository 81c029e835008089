//! Retry policy for per-instrument fetch attempts.

use std::time::Duration;

use crate::provider::ProviderErrorKind;

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Fixed delay between retries.
    Fixed {
        delay: Duration,
    },
    /// Delay grows linearly with the attempt number: `base * attempt`.
    ///
    /// This is the rate-limit ladder: 0.5s, 1.0s, 1.5s, ...
    Linear {
        base: Duration,
    },
    /// Delay grows as `base * (factor ^ attempt)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
        /// Apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Backoff {
    /// Delay for a given attempt number (1-based: the delay taken *after*
    /// that attempt failed).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Linear { base } => base.saturating_mul(attempt.max(1)),
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.saturating_sub(1) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                let mut delay = Duration::from_secs_f64(capped_seconds);

                if jitter {
                    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
                    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
                    let total_ms =
                        delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
                    delay = Duration::from_millis(total_ms.max(0) as u64);
                }

                delay
            }
        }
    }
}

/// Per-instrument fetch retry policy.
///
/// Rate-limited failures back off on the configured ladder; other retryable
/// failures take only the short transient pause but still consume the same
/// attempt budget. Non-retryable failures get no delay because there is no
/// next attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub rate_limit_backoff: Backoff,
    pub transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            rate_limit_backoff: Backoff::Linear {
                base: Duration::from_millis(500),
            },
            transient_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt, or `None` when the failure kind or the
    /// exhausted budget rules out another attempt.
    pub fn delay_for(&self, kind: ProviderErrorKind, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        match kind {
            ProviderErrorKind::RateLimited => Some(self.rate_limit_backoff.delay(attempt)),
            ProviderErrorKind::Transient | ProviderErrorKind::SessionInvalid => {
                Some(self.transient_delay)
            }
            ProviderErrorKind::InvalidRequest | ProviderErrorKind::Unclassified => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_backoff_scales_with_attempt_number() {
        let backoff = Backoff::Linear {
            base: Duration::from_millis(500),
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_millis(1_000));
        assert_eq!(backoff.delay(3), Duration::from_millis(1_500));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let backoff = Backoff::Fixed {
            delay: Duration::from_millis(100),
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: false,
        };

        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(backoff.delay(4), Duration::from_millis(800));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_jitter_stays_within_half_band() {
        let backoff = Backoff::Exponential {
            base: Duration::from_millis(100),
            factor: 2.0,
            max: Duration::from_secs(1),
            jitter: true,
        };

        for _ in 0..10 {
            for attempt in 1..=5 {
                let delay = backoff.delay(attempt);
                let expected = (100.0 * 2_f64.powi(attempt as i32 - 1)).min(1_000.0);
                let delay_ms = delay.as_millis() as f64;
                assert!(delay_ms >= expected * 0.49, "attempt={attempt}, delay={delay_ms}");
                assert!(delay_ms <= expected * 1.51, "attempt={attempt}, delay={delay_ms}");
            }
        }
    }

    #[test]
    fn policy_backs_off_rate_limits_on_the_ladder() {
        let policy = RetryPolicy::default();

        assert_eq!(
            policy.delay_for(ProviderErrorKind::RateLimited, 1),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            policy.delay_for(ProviderErrorKind::RateLimited, 2),
            Some(Duration::from_millis(1_000))
        );
    }

    #[test]
    fn policy_stops_after_attempt_budget() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(ProviderErrorKind::RateLimited, 3), None);
        assert_eq!(policy.delay_for(ProviderErrorKind::Transient, 3), None);
    }

    #[test]
    fn policy_never_retries_unretryable_kinds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(ProviderErrorKind::InvalidRequest, 1), None);
        assert_eq!(policy.delay_for(ProviderErrorKind::Unclassified, 1), None);
    }

    #[test]
    fn transient_failures_take_the_short_pause() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for(ProviderErrorKind::Transient, 1),
            Some(Duration::from_millis(500))
        );
        assert_eq!(
            policy.delay_for(ProviderErrorKind::SessionInvalid, 2),
            Some(Duration::from_millis(500))
        );
    }
}
