//! # Conflict Retry
//!
//! Runs a read-modify-write unit until it stops failing with an
//! optimistic-concurrency conflict, sleeping a growing, capped delay between
//! attempts. Any other error, and the last conflict once the attempts run out,
//! is returned unchanged.
//!
//! Each attempt must read the object afresh: a conflict means the previous
//! read is stale, so nothing fetched in one attempt may be reused in the next.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::ControllerError;

/// Bounded exponential backoff for conflict retries
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub steps: u32,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Growth factor applied per attempt
    pub factor: f64,
    /// Random extra delay, as a fraction of the computed delay
    pub jitter: f64,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    /// 4 attempts, sleeping 10ms, 50ms, 250ms in between
    fn default() -> Self {
        Self {
            steps: 4,
            initial_delay: Duration::from_millis(10),
            factor: 5.0,
            jitter: 0.1,
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based), without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(scaled)
    }

    fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = base.mul_f64(self.jitter * rand::random::<f64>());
        (base + extra).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-conflict error, or the policy
/// runs out of attempts.
pub async fn retry_on_conflict<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, ControllerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ControllerError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(error) if error.is_conflict() && attempt + 1 < policy.steps => {
                let delay = policy.delay(attempt);
                debug!("Conflict on attempt {}, retrying in {:?}: {}", attempt + 1, delay, error);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cluster_store::StoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(steps: u32) -> RetryPolicy {
        RetryPolicy {
            steps,
            initial_delay: Duration::from_millis(1),
            factor: 2.0,
            jitter: 0.0,
            max_delay: Duration::from_millis(5),
        }
    }

    fn conflict() -> ControllerError {
        ControllerError::Store(StoreError::Conflict("stale".to_string()))
    }

    #[tokio::test]
    async fn test_conflict_then_success_is_absorbed() {
        let calls = &AtomicU32::new(0);
        let result = retry_on_conflict(&fast_policy(4), || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(conflict())
            } else {
                Ok("applied")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "applied");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_conflict_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict(&fast_policy(4), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ControllerError::Store(StoreError::NotFound("gone".to_string())))
        })
        .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_conflict() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry_on_conflict(&fast_policy(3), || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(conflict())
        })
        .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_default_policy_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay(0), Duration::from_millis(10));
        assert_eq!(policy.base_delay(1), Duration::from_millis(50));
        assert_eq!(policy.base_delay(2), Duration::from_millis(250));
        // Capped
        assert_eq!(policy.base_delay(3), Duration::from_secs(1));
        assert_eq!(policy.base_delay(40), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_never_exceeds_cap() {
        let policy = RetryPolicy {
            jitter: 1.0,
            ..RetryPolicy::default()
        };
        for attempt in 0..6 {
            let delay = policy.delay(attempt);
            assert!(delay >= policy.base_delay(attempt));
            assert!(delay <= policy.max_delay);
        }
    }
}
