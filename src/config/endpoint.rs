//! Cluster endpoint configuration

use crate::config::ConfigError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    8006
}

fn default_true() -> bool {
    true
}

/// One configured cluster endpoint.
///
/// The password is resolved through `password_env` (an environment variable
/// name) or, for runtime-added endpoints, supplied inline. It is never
/// serialized back out and never appears in `Debug` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Unique identifier for this endpoint
    pub id: String,
    /// Human-readable name (falls back to the id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hostname or IP address of the cluster API
    pub host: String,
    /// API port
    #[serde(default = "default_port")]
    pub port: u16,
    /// API username (e.g., "root@pam")
    pub username: String,
    /// Environment variable holding the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    /// Inline password, used by runtime add requests
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,
    /// Use HTTPS transport
    #[serde(default = "default_true")]
    pub use_tls: bool,
    /// Verify the endpoint's TLS certificate. Off by default: these
    /// clusters commonly run with self-signed certificates.
    #[serde(default)]
    pub verify_tls: bool,
}

impl EndpointConfig {
    /// Base URL of the endpoint's JSON API.
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}/api2/json", scheme, self.host, self.port)
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Resolve the password from `password_env` or the inline value.
    pub fn resolve_password(&self) -> Result<SecretString, ConfigError> {
        if let Some(var) = &self.password_env {
            return std::env::var(var)
                .map(SecretString::new)
                .map_err(|_| ConfigError::Validation {
                    field: format!("endpoints.{}.password_env", self.id),
                    message: format!("environment variable '{}' is not set", var),
                });
        }
        if let Some(password) = &self.password {
            return Ok(password.clone());
        }
        Err(ConfigError::Validation {
            field: format!("endpoints.{}", self.id),
            message: "either password_env or password must be provided".to_string(),
        })
    }
}
