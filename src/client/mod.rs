//! Per-endpoint API client: session lifecycle plus a retrying executor.
//!
//! One `ApiClient` exists per configured endpoint and is the only place
//! that endpoint's session is created, attached, or invalidated. Every
//! call goes through [`ApiClient::execute`], which:
//!
//! 1. authenticates lazily if no session exists,
//! 2. re-authenticates exactly once on a 401 and replays the call,
//! 3. retries transient failures (timeout, connection refused, 5xx)
//!    under the injected [`RetryPolicy`] with linear backoff,
//! 4. records the outcome on the endpoint's [`ConnectionHealth`] and
//!    publishes a connection-status event when the status changes.

mod error;
mod retry;
mod session;
pub mod wire;

pub use error::ClientError;
pub use retry::RetryPolicy;
pub use session::{Credentials, Session, SessionManager};

use crate::config::{ClientConfig, EndpointConfig};
use crate::events::Event;
use crate::inventory::VmKind;
use crate::registry::ConnectionHealth;
use reqwest::{header, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use wire::{ApiEnvelope, NodeEntry, VersionInfo, VmEntry};

/// Authenticated HTTP client for a single cluster endpoint.
pub struct ApiClient {
    endpoint_id: String,
    base_url: String,
    http: reqwest::Client,
    session: SessionManager,
    retry: RetryPolicy,
    timeout_seconds: u64,
    health: Arc<ConnectionHealth>,
    events: Option<broadcast::Sender<Event>>,
}

impl ApiClient {
    /// Build a client for the given endpoint.
    ///
    /// Does not authenticate; the session is created on first use.
    pub fn new(
        config: &EndpointConfig,
        credentials: Credentials,
        client_config: &ClientConfig,
        health: Arc<ConnectionHealth>,
        events: Option<broadcast::Sender<Event>>,
    ) -> Result<Self, ClientError> {
        let timeout_seconds = client_config.request_timeout_seconds;
        // Self-signed certificates are the norm for these clusters, so
        // certificate validation is opt-in per endpoint. Transport stays
        // encrypted either way.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let base_url = config.base_url();
        let session = SessionManager::new(base_url.clone(), credentials, http.clone());

        Ok(Self {
            endpoint_id: config.id.clone(),
            base_url,
            http,
            session,
            retry: RetryPolicy::from(client_config),
            timeout_seconds,
            health,
            events,
        })
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn health(&self) -> &Arc<ConnectionHealth> {
        &self.health
    }

    /// Execute one logical call against the endpoint.
    ///
    /// Returns the unwrapped `data` payload on success. See the module
    /// docs for the auth/retry algorithm.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        if !self.session.is_valid().await {
            self.authenticate_or_fail().await?;
        }

        let mut attempt = 0u32;
        let mut reauthenticated = false;

        loop {
            match self.send_once(&method, path, body.as_ref()).await {
                Ok(data) => {
                    self.mark_connected();
                    return Ok(data);
                }
                Err(ClientError::Http { status: 401, .. }) if !reauthenticated => {
                    // The session was rejected: invalidate it, authenticate
                    // once, and replay the same call.
                    reauthenticated = true;
                    self.session.invalidate().await;
                    tracing::debug!(
                        endpoint_id = %self.endpoint_id,
                        "session rejected, re-authenticating"
                    );
                    self.authenticate_or_fail().await?;
                }
                Err(ClientError::Http { status: 401, .. }) => {
                    let err =
                        ClientError::Auth("session rejected after re-authentication".to_string());
                    self.mark_error(&err);
                    return Err(err);
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay(attempt);
                    tracing::debug!(
                        endpoint_id = %self.endpoint_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    self.mark_error(&e);
                    return Err(e);
                }
            }
        }
    }

    /// Convenience wrapper for GET calls.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.execute(Method::GET, path, None).await
    }

    /// Convenience wrapper for POST calls.
    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, ClientError> {
        self.execute(Method::POST, path, body).await
    }

    /// Version/health probe used for connectivity tests.
    pub async fn version(&self) -> Result<VersionInfo, ClientError> {
        let data = self.get("/version").await?;
        serde_json::from_value(data).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// Force a fresh authenticate + lightweight call cycle.
    pub async fn probe(&self) -> Result<VersionInfo, ClientError> {
        self.session.invalidate().await;
        self.version().await
    }

    /// List the cluster's member nodes.
    pub async fn list_nodes(&self) -> Result<Vec<NodeEntry>, ClientError> {
        let data = self.get("/nodes").await?;
        serde_json::from_value(data).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    /// List the guests of one kind on one node.
    pub async fn list_vms(&self, node: &str, kind: VmKind) -> Result<Vec<VmEntry>, ClientError> {
        let data = self
            .get(&format!("/nodes/{}/{}", node, kind.api_segment()))
            .await?;
        serde_json::from_value(data).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn authenticate_or_fail(&self) -> Result<(), ClientError> {
        match self.session.authenticate().await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.mark_error(&e);
                Err(e)
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ClientError> {
        let (ticket, csrf_token) = self
            .session
            .request_credentials()
            .await
            .ok_or_else(|| ClientError::Auth("no active session".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(header::COOKIE, format!("PVEAuthCookie={}", ticket));

        // The anti-forgery token is only required on mutating requests.
        if *method != Method::GET {
            request = request.header("CSRFPreventionToken", csrf_token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_transport(e, self.timeout_seconds))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Http {
                status: 401,
                message: "ticket rejected".to_string(),
            });
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<Value> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;
        Ok(envelope.data)
    }

    fn mark_connected(&self) {
        if let Some(status) = self.health.mark_connected() {
            tracing::info!(endpoint_id = %self.endpoint_id, ?status, "endpoint connected");
            self.publish_status_change();
        }
    }

    fn mark_error(&self, cause: &ClientError) {
        if let Some(status) = self.health.mark_error(&cause.to_string()) {
            tracing::warn!(
                endpoint_id = %self.endpoint_id,
                ?status,
                error = %cause,
                "endpoint entered error state"
            );
            self.publish_status_change();
        }
    }

    fn publish_status_change(&self) {
        if let Some(sender) = &self.events {
            let _ = sender.send(Event::ConnectionChanged {
                endpoint_id: self.endpoint_id.clone(),
                status: self.health.status(),
                last_error: self.health.last_error(),
            });
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("endpoint_id", &self.endpoint_id)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
