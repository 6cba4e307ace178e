//! Call pacing and deadlines shared by the probes.
//!
//! [`RateLimiter`] spaces the start of successive API calls by a fixed
//! interval; [`with_deadline`] races a probe against its time budget.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout};

use crate::probes::ProbeError;

/// Default spacing between two API calls issued through the same limiter.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(150);

/// Enforces a minimum interval between the starts of successive calls.
///
/// Each caller reserves the next free slot under the lock and sleeps outside
/// of it, so concurrent probes are serialised without blocking each other's
/// unrelated work. There is no burst allowance.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns once the caller may issue its call.
    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().expect("rate limiter lock poisoned");
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };

        if slot > Instant::now() {
            sleep_until(slot).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

/// Resolves `operation` unless `deadline` elapses first.
///
/// On expiry the operation is dropped, which cancels any request it still has
/// in flight, and [`ProbeError::Timeout`] is returned.
pub async fn with_deadline<T, F>(operation: F, deadline: Duration) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn sequential_waits_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(150));
        let started = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }
        assert!(started.elapsed() >= Duration::from_millis(4 * 150));
    }

    #[tokio::test(start_paused = true)]
    async fn first_wait_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let started = Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let started = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.wait().await;
                Instant::now()
            }));
        }

        let mut stamps = Vec::new();
        for handle in handles {
            stamps.push(handle.await.unwrap());
        }
        stamps.sort();

        for pair in stamps.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
        assert!(started.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn unlimited_limiter_never_sleeps() {
        let limiter = RateLimiter::unlimited();
        let started = Instant::now();
        for _ in 0..100 {
            limiter.wait().await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passes_through_results() {
        let value = with_deadline(async { Ok::<_, ProbeError>(7) }, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, 7);

        let err = with_deadline(
            async { Err::<u8, _>(ProbeError::NotFound("user".into())) },
            Duration::from_secs(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_reports_timeout() {
        let err = with_deadline(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, ProbeError>(())
            },
            Duration::from_secs(15),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProbeError::Timeout(d) if d == Duration::from_secs(15)));
    }
}
