//! Retry policy for transient request failures.

use crate::config::ClientConfig;
use std::time::Duration;

/// An explicit retry policy: maximum attempts and a linear backoff.
///
/// The delay grows linearly with the attempt number (`attempt * base`),
/// so a 1s base yields 1s, 2s, 3s between attempts. Injected into the
/// request executor so retry behavior is testable without a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt
    pub max_retries: u32,
    /// Base delay multiplied by the attempt number
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base: Duration::ZERO,
        }
    }

    /// Delay before the given retry attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_base * attempt
    }
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}
