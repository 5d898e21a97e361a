//! Bounded retry with exponential backoff.
//!
//! Retry decisions are driven purely by the error classification: only
//! `RateLimited` and `Transient` failures are retried, everything else is
//! terminal on the first occurrence.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use edge_venues::VenueError;

/// Retry parameters for venue submissions.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(6),
        }
    }
}

impl RetryPolicy {
    /// Zero-delay policy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let capped = base
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// How a retried operation ultimately failed.
#[derive(Debug)]
pub enum RetryError {
    /// Non-retryable failure; carries the venue's own reason.
    Terminal(VenueError),
    /// Retryable failures all the way to the attempt bound.
    Exhausted { attempts: u32, last: VenueError },
}

/// Run `op` until success, a terminal error, or the attempt bound.
///
/// `op` receives the zero-based attempt number.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, VenueError>>,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(RetryError::Terminal(e)),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    });
                }
                let delay = policy.delay_for(attempt - 1);
                warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "venue call failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_first_try() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&RetryPolicy::immediate(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, VenueError>(42) }
        })
        .await
        .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_stops_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&RetryPolicy::immediate(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VenueError::RejectedByVenue("bad order".into())) }
        })
        .await;
        assert!(matches!(result, Err(RetryError::Terminal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_after_bound() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(&RetryPolicy::immediate(3), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(VenueError::RateLimited("throttle".into())) }
        })
        .await;
        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_recovers_mid_sequence() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(&RetryPolicy::immediate(3), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(VenueError::Transient("502".into()))
                } else {
                    Ok("order-1")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(result, "order-1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(6),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(9), Duration::from_secs(6));
    }
}
