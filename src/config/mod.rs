//! Configuration module for Warden
//!
//! Provides layered configuration loading from files, environment variables, and defaults.
//!
//! # Configuration Precedence
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`WARDEN_*`)
//! 3. Configuration file (TOML)
//! 4. Default values (lowest priority)
//!
//! # Example
//!
//! ```rust
//! use warden::config::WardenConfig;
//!
//! // Load defaults
//! let config = WardenConfig::default();
//! assert_eq!(config.server.port, 8010);
//!
//! // Parse from TOML
//! let toml = r#"
//! [server]
//! port = 9000
//! "#;
//! let config: WardenConfig = toml::from_str(toml).unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```

pub mod client;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod server;

pub use client::ClientConfig;
pub use endpoint::EndpointConfig;
pub use error::ConfigError;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;

// Re-export section configs owned by their subsystems
pub use crate::alerts::AlertsConfig;
pub use crate::dispatch::DispatchConfig;
pub use crate::poller::PollerConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Unified configuration for the Warden server.
///
/// Aggregates all configuration sections: the downstream HTTP server, the
/// request executor, state polling, batch dispatch, alerting, logging, and
/// the static `[[endpoints]]` definitions.
///
/// # Example
///
/// ```rust
/// use warden::config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.server.port, 8010);
/// assert!(config.endpoints.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WardenConfig {
    /// Downstream HTTP server configuration
    pub server: ServerConfig,
    /// Request executor (retry/timeout) configuration
    pub client: ClientConfig,
    /// State poller configuration
    pub poller: PollerConfig,
    /// Batch dispatch configuration
    pub dispatch: DispatchConfig,
    /// Alert threshold configuration
    pub alerts: AlertsConfig,
    /// Static endpoint definitions
    pub endpoints: Vec<EndpointConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Load configuration from a TOML file
    ///
    /// If path is None, returns default configuration.
    /// If path doesn't exist, returns NotFound error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supports WARDEN_* environment variables for common settings.
    /// Invalid values are silently ignored (defaults are kept).
    pub fn with_env_overrides(mut self) -> Self {
        // Server settings
        if let Ok(port) = std::env::var("WARDEN_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(host) = std::env::var("WARDEN_HOST") {
            self.server.host = host;
        }

        // Logging settings
        if let Ok(level) = std::env::var("WARDEN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("WARDEN_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }

        // Polling and alerting
        if let Ok(poller) = std::env::var("WARDEN_POLLER") {
            self.poller.enabled = poller.to_lowercase() == "true";
        }
        if let Ok(alerts) = std::env::var("WARDEN_ALERTS") {
            self.alerts.enabled = alerts.to_lowercase() == "true";
        }

        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation {
                field: "server.port".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }

        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::Validation {
                field: "dispatch.max_concurrency".to_string(),
                message: "concurrency must be at least 1".to_string(),
            });
        }

        if self.poller.change_threshold_percent < 0.0 {
            return Err(ConfigError::Validation {
                field: "poller.change_threshold_percent".to_string(),
                message: "threshold cannot be negative".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.id.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("endpoints[{}].id", i),
                    message: "id cannot be empty".to_string(),
                });
            }
            if !seen.insert(endpoint.id.as_str()) {
                return Err(ConfigError::Validation {
                    field: format!("endpoints[{}].id", i),
                    message: format!("duplicate endpoint id '{}'", endpoint.id),
                });
            }
            if endpoint.host.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("endpoints[{}].host", i),
                    message: "host cannot be empty".to_string(),
                });
            }
            if endpoint.username.is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("endpoints[{}].username", i),
                    message: "username cannot be empty".to_string(),
                });
            }
        }

        self.alerts.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_warden_config_defaults() {
        let config = WardenConfig::default();
        assert_eq!(config.server.port, 8010);
        assert!(config.poller.enabled);
        assert!(config.alerts.enabled);
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml = r#"
        [server]
        port = 9000
        "#;

        let config: WardenConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0"); // Default
    }

    #[test]
    fn test_config_parse_full_toml() {
        let toml = include_str!("../../warden.example.toml");
        let config: WardenConfig = toml::from_str(toml).unwrap();
        assert!(config.server.port > 0);
        assert!(!config.endpoints.is_empty());
    }

    #[test]
    fn test_config_parse_endpoints_array() {
        let toml = r#"
        [[endpoints]]
        id = "pve1"
        host = "10.0.0.10"
        username = "root@pam"
        password_env = "PVE1_PASSWORD"

        [[endpoints]]
        id = "pve2"
        host = "10.0.0.20"
        port = 443
        username = "monitor@pve"
        password_env = "PVE2_PASSWORD"
        "#;

        let config: WardenConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].port, 443);
    }

    #[test]
    fn test_config_load_from_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), "[server]\nport = 8080").unwrap();

        let config = WardenConfig::load(Some(temp.path())).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_missing_file_error() {
        let result = WardenConfig::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_config_env_override_port() {
        std::env::set_var("WARDEN_PORT", "9999");
        let config = WardenConfig::default().with_env_overrides();
        std::env::remove_var("WARDEN_PORT");

        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_config_env_override_host() {
        std::env::set_var("WARDEN_HOST", "127.0.0.1");
        let config = WardenConfig::default().with_env_overrides();
        std::env::remove_var("WARDEN_HOST");

        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_env_invalid_value_ignored() {
        std::env::set_var("WARDEN_PORT", "not-a-number");
        let config = WardenConfig::default().with_env_overrides();
        std::env::remove_var("WARDEN_PORT");

        // Should keep default, not crash
        assert_eq!(config.server.port, 8010);
    }

    #[test]
    fn test_config_env_override_poller() {
        std::env::set_var("WARDEN_POLLER", "false");
        let config = WardenConfig::default().with_env_overrides();
        std::env::remove_var("WARDEN_POLLER");

        assert!(!config.poller.enabled);
    }

    #[test]
    fn test_config_validation_zero_port() {
        let mut config = WardenConfig::default();
        config.server.port = 0;

        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "server.port"
        ));
    }

    #[test]
    fn test_config_validation_duplicate_endpoint_id() {
        let toml = r#"
        [[endpoints]]
        id = "pve1"
        host = "10.0.0.10"
        username = "root@pam"

        [[endpoints]]
        id = "pve1"
        host = "10.0.0.20"
        username = "root@pam"
        "#;

        let config: WardenConfig = toml::from_str(toml).unwrap();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref message, .. }) if message.contains("duplicate")
        ));
    }

    #[test]
    fn test_config_validation_empty_endpoint_host() {
        let toml = r#"
        [[endpoints]]
        id = "pve1"
        host = ""
        username = "root@pam"
        "#;

        let config: WardenConfig = toml::from_str(toml).unwrap();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field.contains("host")
        ));
    }

    #[test]
    fn test_config_validation_zero_concurrency() {
        let mut config = WardenConfig::default();
        config.dispatch.max_concurrency = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_load_none_returns_defaults() {
        let config = WardenConfig::load(None).unwrap();
        assert_eq!(config.server.port, 8010);
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
