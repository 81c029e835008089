//! Upstream request-rate throttling shared by all fetch workers.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::retry::Backoff;

/// Request-rate policy for one upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPolicy {
    pub quota_window: Duration,
    pub quota_limit: u32,
    pub retry_backoff: Backoff,
    pub max_backoff: Duration,
}

impl ProviderPolicy {
    /// Default modeled on the upstream's documented ~3 requests/second,
    /// with headroom for the burst a full scan fan-out produces.
    pub fn upstream_default() -> Self {
        Self {
            quota_window: Duration::from_secs(1),
            quota_limit: 3,
            retry_backoff: Backoff::Linear {
                base: Duration::from_millis(500),
            },
            max_backoff: Duration::from_secs(10),
        }
    }
}

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    retry_count: u32,
}

/// In-memory throttling queue that tracks pending requests and computes
/// retry delays. Shared across the scan cycle's worker pool.
#[derive(Clone)]
pub struct ThrottlingQueue {
    limiter: Arc<DirectRateLimiter>,
    pending: Arc<Mutex<VecDeque<PendingRequest>>>,
    retry_backoff: Backoff,
    max_backoff: Duration,
}

impl ThrottlingQueue {
    pub fn new(policy: &ProviderPolicy) -> Self {
        let quota = quota_from_window(policy.quota_window, policy.quota_limit);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            retry_backoff: policy.retry_backoff,
            max_backoff: policy.max_backoff,
        }
    }

    /// Tries to acquire rate budget. When budget is unavailable the request
    /// is buffered and the recommended backoff delay is returned.
    pub fn acquire(&self) -> Result<(), Duration> {
        if self.limiter.check().is_ok() {
            return Ok(());
        }

        let mut pending = self
            .pending
            .lock()
            .expect("throttling pending queue should not be poisoned");
        pending.push_back(PendingRequest { retry_count: 0 });

        Err(self.retry_delay(1))
    }

    /// Retries the oldest buffered request against the limiter. On success
    /// the request leaves the queue.
    pub fn reacquire(&self) -> bool {
        if self.limiter.check().is_ok() {
            self.complete_one();
            true
        } else {
            false
        }
    }

    /// Increments retry count for the oldest buffered request and returns
    /// its next delay.
    pub fn register_retry(&self) -> Option<Duration> {
        let mut pending = self
            .pending
            .lock()
            .expect("throttling pending queue should not be poisoned");
        let request = pending.front_mut()?;
        request.retry_count = request.retry_count.saturating_add(1);
        Some(self.retry_delay(request.retry_count))
    }

    /// Removes a request from the pending queue when it was successfully
    /// retried.
    pub fn complete_one(&self) {
        let mut pending = self
            .pending
            .lock()
            .expect("throttling pending queue should not be poisoned");
        let _ = pending.pop_front();
    }

    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .expect("throttling pending queue should not be poisoned")
            .len()
    }

    fn retry_delay(&self, retry_count: u32) -> Duration {
        self.retry_backoff.delay(retry_count).min(self.max_backoff)
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(window: Duration, limit: u32) -> ProviderPolicy {
        ProviderPolicy {
            quota_window: window,
            quota_limit: limit,
            retry_backoff: Backoff::Linear {
                base: Duration::from_secs(1),
            },
            max_backoff: Duration::from_secs(3),
        }
    }

    #[test]
    fn buffers_when_rate_limit_is_exceeded() {
        let queue = ThrottlingQueue::new(&policy(Duration::from_secs(60), 2));

        assert!(queue.acquire().is_ok());
        assert!(queue.acquire().is_ok());

        let retry_delay = queue.acquire().expect_err("third request should be queued");
        assert_eq!(retry_delay, Duration::from_secs(1));
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn retry_delay_grows_and_is_capped() {
        let queue = ThrottlingQueue::new(&policy(Duration::from_secs(60), 1));
        assert!(queue.acquire().is_ok());
        let _ = queue.acquire();

        assert_eq!(queue.register_retry(), Some(Duration::from_secs(1)));
        assert_eq!(queue.register_retry(), Some(Duration::from_secs(2)));
        assert_eq!(queue.register_retry(), Some(Duration::from_secs(3)));
        // capped at max_backoff
        assert_eq!(queue.register_retry(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn reacquire_fails_while_budget_is_exhausted() {
        // 60s window with burst 1: the cell refunds a minute out, so an
        // immediate reacquire cannot succeed and the request stays queued.
        let queue = ThrottlingQueue::new(&policy(Duration::from_secs(60), 1));
        assert!(queue.acquire().is_ok());
        let _ = queue.acquire();
        assert_eq!(queue.pending_len(), 1);

        assert!(!queue.reacquire());
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn completing_a_request_drains_the_pending_queue() {
        let queue = ThrottlingQueue::new(&policy(Duration::from_secs(60), 1));
        assert!(queue.acquire().is_ok());
        let _ = queue.acquire();
        assert_eq!(queue.pending_len(), 1);

        queue.complete_one();
        assert_eq!(queue.pending_len(), 0);
        assert_eq!(queue.register_retry(), None);
    }
}
