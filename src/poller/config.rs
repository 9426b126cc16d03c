//! Configuration for state polling.

use serde::{Deserialize, Serialize};

/// Configuration for the per-endpoint state poller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Whether state polling is enabled
    pub enabled: bool,
    /// Seconds between poll cycles
    pub interval_seconds: u64,
    /// Extra delay after a failed cycle before polling resumes
    pub failure_backoff_seconds: u64,
    /// Minimum percentage-point movement for a change event
    pub change_threshold_percent: f64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 30,
            failure_backoff_seconds: 10,
            change_threshold_percent: 1.0,
        }
    }
}
