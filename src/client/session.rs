//! Session management for authenticated cluster endpoints.
//!
//! Each endpoint issues a two-part credential on login: a ticket attached
//! to every request, and an anti-forgery token attached to mutating
//! requests. A session has no client-side expiry; it is considered valid
//! until the endpoint rejects it with a 401.

use crate::client::error::ClientError;
use crate::client::wire::{ApiEnvelope, TicketData};
use secrecy::{ExposeSecret, SecretString};
use std::time::Instant;
use tokio::sync::RwLock;

/// Login credentials for one endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// A live ticket + anti-forgery token pair.
#[derive(Debug)]
pub struct Session {
    ticket: SecretString,
    csrf_token: SecretString,
    issued_at: Instant,
}

impl Session {
    fn new(ticket: String, csrf_token: String) -> Self {
        Self {
            ticket: SecretString::new(ticket),
            csrf_token: SecretString::new(csrf_token),
            issued_at: Instant::now(),
        }
    }

    /// Age of the session, for diagnostics only. Validity is decided by
    /// the endpoint, not by elapsed time.
    pub fn age(&self) -> std::time::Duration {
        self.issued_at.elapsed()
    }
}

/// Manages the authentication lifecycle for a single endpoint.
///
/// The session is an owned, single-writer value: only this endpoint's
/// request executor mutates it, and a successful `authenticate` replaces
/// any prior session atomically.
pub struct SessionManager {
    base_url: String,
    credentials: Credentials,
    http: reqwest::Client,
    session: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new(base_url: String, credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            base_url,
            credentials,
            http,
            session: RwLock::new(None),
        }
    }

    /// Authenticate against the endpoint's session-creation endpoint.
    ///
    /// Any failure (bad credentials, network error, non-2xx) is reported
    /// as an auth error with a human-readable cause. Never retried here;
    /// retry is the request executor's responsibility.
    pub async fn authenticate(&self) -> Result<(), ClientError> {
        let url = format!("{}/access/ticket", self.base_url);
        let params = [
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose_secret().as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ClientError::Auth(format!("could not reach endpoint: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Auth(format!(
                "endpoint rejected credentials (HTTP {})",
                status.as_u16()
            )));
        }

        let envelope: ApiEnvelope<TicketData> = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(format!("malformed ticket response: {}", e)))?;

        let session = Session::new(envelope.data.ticket, envelope.data.csrf_token);
        *self.session.write().await = Some(session);

        tracing::debug!(username = %self.credentials.username, "session established");
        Ok(())
    }

    /// Whether a session currently exists. A session is valid until a
    /// downstream 401 invalidates it.
    pub async fn is_valid(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Drop the current session, forcing re-authentication on next use.
    pub async fn invalidate(&self) {
        *self.session.write().await = None;
    }

    /// Clone out the (ticket, anti-forgery token) pair for attaching to a
    /// request. Returns None when no session exists.
    pub(crate) async fn request_credentials(&self) -> Option<(String, String)> {
        self.session.read().await.as_ref().map(|s| {
            (
                s.ticket.expose_secret().clone(),
                s.csrf_token.expose_secret().clone(),
            )
        })
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url)
            .field("username", &self.credentials.username)
            .finish_non_exhaustive()
    }
}
