//! Alert record handlers.

use crate::alerts::{AlertFilter, AlertRecord};
use crate::api::error::ApiError;
use crate::api::AppState;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/alerts - List alert records, newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<AlertFilter>,
) -> Json<Vec<AlertRecord>> {
    Json(state.orchestrator.list_alerts(&filter))
}

/// POST /api/alerts/:id/acknowledge - Operator acknowledgement.
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertRecord>, ApiError> {
    Ok(Json(state.orchestrator.acknowledge_alert(id)?))
}

/// POST /api/alerts/:id/resolve - Operator resolution.
pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertRecord>, ApiError> {
    Ok(Json(state.orchestrator.resolve_alert(id)?))
}

/// DELETE /api/alerts/:id - Drop a record outright.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.delete_alert(id)?;
    Ok(StatusCode::NO_CONTENT)
}
