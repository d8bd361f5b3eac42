//! # Requeue Backoff
//!
//! Fibonacci backoff for requeueing a tenant whose reconcile failed. It grows
//! more slowly than exponential backoff, so a tenant stuck on a persistent
//! error keeps being retried without hammering the API server.
//!
//! Sequence with the defaults: 1m, 1m, 2m, 3m, 5m, 8m, 10m (max).

use std::time::Duration;

/// Fibonacci backoff state for one tenant
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
    /// Consecutive failures since the last success
    failures: u32,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(600))
    }
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
            failures: 0,
        }
    }

    /// Record a failure and return how long to wait before the next attempt
    pub fn next_backoff(&mut self) -> Duration {
        let delay = self.current;
        let next = self.prev + self.current;
        self.prev = self.current;
        self.current = next.min(self.max);
        self.failures += 1;
        delay
    }

    /// Consecutive failures recorded so far
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Back to the initial state after a successful reconcile
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
        self.failures = 0;
    }
}
