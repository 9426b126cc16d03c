//! Command dispatch handlers.

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::dispatch::{Action, BatchResult, BatchTarget};
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// Body of a single-target dispatch.
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub target: BatchTarget,
    pub action: Action,
}

/// Body of a batch dispatch.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub targets: Vec<BatchTarget>,
    pub action: Action,
}

/// POST /api/actions - Run one action against one target.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DispatchRequest>,
) -> Result<Json<BatchResult>, ApiError> {
    let result = state
        .orchestrator
        .dispatch_action(request.target, request.action)
        .await;
    Ok(Json(result))
}

/// POST /api/actions/batch - Run one action against many targets.
///
/// Always answers 200 with one result per target; per-target failures
/// are carried inside the results, never as an HTTP error.
pub async fn dispatch_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Json<Vec<BatchResult>> {
    let results = state
        .orchestrator
        .dispatch_batch(request.targets, request.action)
        .await;
    Json(results)
}
