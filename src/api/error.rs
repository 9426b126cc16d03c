//! API error envelope and status-code mapping.

use crate::alerts::AlertError;
use crate::orchestrator::OrchestratorError;
use crate::registry::RegistryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Error body returned by every failing API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub code: String,
}

/// API-level error with its HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ApiErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                message: message.into(),
                code: code.to_string(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "conflict", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.body }))).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match &e {
            OrchestratorError::Registry(RegistryError::DuplicateEndpoint(_)) => {
                Self::conflict(e.to_string())
            }
            OrchestratorError::Registry(RegistryError::EndpointNotFound(_)) => {
                Self::not_found(e.to_string())
            }
            OrchestratorError::Alert(AlertError::NotFound(_)) => Self::not_found(e.to_string()),
            OrchestratorError::Alert(AlertError::InvalidTransition(_)) => {
                Self::conflict(e.to_string())
            }
            OrchestratorError::Config(_) => Self::bad_request(e.to_string()),
            OrchestratorError::Client(_) => {
                Self::new(StatusCode::BAD_GATEWAY, "upstream_error", e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_endpoint_maps_to_conflict() {
        let error: ApiError =
            OrchestratorError::from(RegistryError::DuplicateEndpoint("ep1".to_string())).into();
        assert_eq!(error.status, StatusCode::CONFLICT);
        assert_eq!(error.body.code, "conflict");
    }

    #[test]
    fn test_unknown_endpoint_maps_to_not_found() {
        let error: ApiError =
            OrchestratorError::from(RegistryError::EndpointNotFound("ep1".to_string())).into();
        assert_eq!(error.status, StatusCode::NOT_FOUND);
        assert!(error.body.message.contains("ep1"));
    }
}
