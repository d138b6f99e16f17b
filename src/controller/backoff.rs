//! # Fixed Retry Policy
//!
//! Bounded retry with a constant delay between attempts, used for applying the
//! EKS Connector manifests to a newly registered cluster.
//!
//! ## Usage
//!
//! ```rust
//! use cluster_registration_controller::controller::backoff::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(3));
//! assert_eq!(policy.max_attempts(), 4);
//! ```

use std::time::Duration;

/// Retry bound and spacing for an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    max_retries: u32,
    /// Delay slept between two consecutive attempts
    delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Total number of attempts, including the first one
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether another attempt is allowed after `attempts_made` failures
    #[must_use]
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        use crate::constants::{DEFAULT_APPLY_MAX_RETRIES, DEFAULT_APPLY_RETRY_DELAY_SECS};
        Self::new(
            DEFAULT_APPLY_MAX_RETRIES,
            Duration::from_secs(DEFAULT_APPLY_RETRY_DELAY_SECS),
        )
    }
}
