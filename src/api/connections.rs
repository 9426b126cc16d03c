//! Endpoint connection management handlers.

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::config::EndpointConfig;
use crate::registry::ConnectionView;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// GET /api/connections - List all endpoint connections.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<ConnectionView>> {
    Json(state.orchestrator.list_connections())
}

/// POST /api/connections - Register a new endpoint.
///
/// Does not authenticate eagerly; the first poll or test does.
pub async fn add(
    State(state): State<Arc<AppState>>,
    Json(config): Json<EndpointConfig>,
) -> Result<(StatusCode, Json<ConnectionView>), ApiError> {
    let id = config.id.clone();
    state.orchestrator.add_endpoint(config)?;

    let view = state
        .orchestrator
        .list_connections()
        .into_iter()
        .find(|c| c.id == id)
        .ok_or_else(|| ApiError::not_found(format!("endpoint not found: {}", id)))?;

    Ok((StatusCode::CREATED, Json(view)))
}

/// DELETE /api/connections/:id - Remove an endpoint and all its state.
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.remove_endpoint(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Result of a connectivity test.
#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub reachable: bool,
}

/// POST /api/connections/:id/test - Probe the endpoint.
pub async fn test(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TestResponse>, ApiError> {
    let reachable = state.orchestrator.test_endpoint(&id).await?;
    Ok(Json(TestResponse { reachable }))
}

/// POST /api/connections/:id/refresh - Poll the endpoint immediately.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.refresh_endpoint(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
