//! Request executor configuration

use serde::{Deserialize, Serialize};

/// Configuration for the per-endpoint request executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout for each individual HTTP call
    pub request_timeout_seconds: u64,
    /// Retries for transient failures (timeout, connection refused, 5xx)
    pub max_retries: u32,
    /// Base delay for the linear backoff between retries
    pub retry_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 10,
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}
