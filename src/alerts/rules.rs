//! Alert threshold configuration.

use crate::alerts::record::AlertLevel;
use crate::config::ConfigError;
use serde::{Deserialize, Serialize};

/// Thresholds for one dimension, one per level. A level without a
/// threshold never fires.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LevelThresholds {
    pub info: Option<f64>,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl LevelThresholds {
    pub fn warning_critical(warning: f64, critical: f64) -> Self {
        Self {
            info: None,
            warning: Some(warning),
            critical: Some(critical),
        }
    }

    /// Highest breached level for a value, critical > warning > info.
    /// Returns the level and the threshold that was crossed.
    pub fn classify(&self, value: f64) -> Option<(AlertLevel, f64)> {
        for (level, threshold) in [
            (AlertLevel::Critical, self.critical),
            (AlertLevel::Warning, self.warning),
            (AlertLevel::Info, self.info),
        ] {
            if let Some(threshold) = threshold {
                if value >= threshold {
                    return Some((level, threshold));
                }
            }
        }
        None
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        let ordered = [self.info, self.warning, self.critical];
        let mut prev: Option<f64> = None;
        for threshold in ordered.into_iter().flatten() {
            if let Some(prev) = prev {
                if threshold <= prev {
                    return Err(ConfigError::Validation {
                        field: field.to_string(),
                        message: "thresholds must increase with severity".to_string(),
                    });
                }
            }
            prev = Some(threshold);
        }
        Ok(())
    }
}

/// Alert evaluation configuration.
///
/// CPU, memory, and disk thresholds are percentages; network thresholds
/// are bytes per second (rx+tx) and disabled unless configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub cpu: LevelThresholds,
    pub memory: LevelThresholds,
    pub disk: LevelThresholds,
    pub network: LevelThresholds,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cpu: LevelThresholds::warning_critical(80.0, 90.0),
            memory: LevelThresholds::warning_critical(85.0, 95.0),
            disk: LevelThresholds::warning_critical(85.0, 95.0),
            network: LevelThresholds::default(),
        }
    }
}

impl AlertsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cpu.validate("alerts.cpu")?;
        self.memory.validate("alerts.memory")?;
        self.disk.validate("alerts.disk")?;
        self.network.validate("alerts.network")?;
        Ok(())
    }
}
