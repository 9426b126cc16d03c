//! Per-endpoint runtime state: connection health and the live handle.

use crate::client::ApiClient;
use crate::config::EndpointConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;

/// Observable health of an endpoint connection.
///
/// Transitions only through request-executor outcomes; nothing else may
/// set it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Last call succeeded
    Connected,
    /// No call has been made yet
    Disconnected,
    /// Last call failed (auth or exhausted transient retries)
    Error,
}

#[derive(Debug, Clone)]
struct HealthState {
    status: ConnectionStatus,
    last_error: Option<String>,
    last_connected_at: Option<DateTime<Utc>>,
}

/// Connection-health cell shared between an endpoint's request executor
/// (the only writer) and its readers.
#[derive(Debug)]
pub struct ConnectionHealth {
    state: RwLock<HealthState>,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionHealth {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HealthState {
                status: ConnectionStatus::Disconnected,
                last_error: None,
                last_connected_at: None,
            }),
        }
    }

    /// Record a successful call. Returns the new status when this caused
    /// a transition, None otherwise.
    pub fn mark_connected(&self) -> Option<ConnectionStatus> {
        let mut state = self.state.write().expect("health cell poisoned");
        let transitioned = state.status != ConnectionStatus::Connected;
        state.status = ConnectionStatus::Connected;
        state.last_error = None;
        state.last_connected_at = Some(Utc::now());
        transitioned.then_some(ConnectionStatus::Connected)
    }

    /// Record a failed call with its cause. Returns the new status when
    /// this caused a transition, None otherwise.
    pub fn mark_error(&self, cause: &str) -> Option<ConnectionStatus> {
        let mut state = self.state.write().expect("health cell poisoned");
        let transitioned = state.status != ConnectionStatus::Error;
        state.status = ConnectionStatus::Error;
        state.last_error = Some(cause.to_string());
        transitioned.then_some(ConnectionStatus::Error)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.read().expect("health cell poisoned").status
    }

    pub fn last_error(&self) -> Option<String> {
        self.state
            .read()
            .expect("health cell poisoned")
            .last_error
            .clone()
    }

    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .expect("health cell poisoned")
            .last_connected_at
    }
}

/// Live handle for one registered endpoint.
///
/// Owns the endpoint's client, health cell, and the cancellation token
/// of its poll loop. Credentials live inside the client's session
/// manager and are not reachable from here.
pub struct EndpointHandle {
    pub config: EndpointConfig,
    pub client: Arc<ApiClient>,
    pub health: Arc<ConnectionHealth>,
    pub cancel: CancellationToken,
}

impl EndpointHandle {
    /// Serializable view of this endpoint's connection state.
    pub fn view(&self) -> ConnectionView {
        ConnectionView {
            id: self.config.id.clone(),
            name: self.config.display_name().to_string(),
            host: self.config.host.clone(),
            port: self.config.port,
            status: self.health.status(),
            last_error: self.health.last_error(),
            last_connected_at: self.health.last_connected_at(),
        }
    }
}

impl std::fmt::Debug for EndpointHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHandle")
            .field("id", &self.config.id)
            .field("status", &self.health.status())
            .finish_non_exhaustive()
    }
}

/// Serializable view of an endpoint connection (credentials excluded).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionView {
    pub id: String,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub status: ConnectionStatus,
    pub last_error: Option<String>,
    pub last_connected_at: Option<DateTime<Utc>>,
}
