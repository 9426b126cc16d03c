//! Error types for batch dispatch.

use crate::client::ClientError;
use thiserror::Error;

/// Errors that can occur while dispatching a batch target.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Denylisted shell command, rejected pre-flight
    #[error("command rejected by policy: {0}")]
    PolicyViolation(String),

    /// Target does not resolve to a known guest
    #[error("no such virtual machine: {endpoint_id}/{node}/{vmid}")]
    NotFound {
        endpoint_id: String,
        node: String,
        vmid: u32,
    },

    /// Target names an endpoint that is not registered
    #[error("endpoint not found: {0}")]
    UnknownEndpoint(String),

    /// The pool-wide deadline elapsed before the target completed
    #[error("batch deadline exceeded after {0}s")]
    Deadline(u64),

    /// The upstream call failed
    #[error(transparent)]
    Client(#[from] ClientError),
}
