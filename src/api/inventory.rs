//! Inventory pull handlers: current node and guest snapshots.

use crate::api::AppState;
use crate::inventory::{NodeSnapshot, VmSnapshot};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

/// Optional endpoint filter for inventory listings.
#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub endpoint: Option<String>,
}

/// GET /api/nodes - Current node snapshots.
pub async fn nodes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InventoryQuery>,
) -> Json<Vec<NodeSnapshot>> {
    Json(state.orchestrator.list_nodes(query.endpoint.as_deref()))
}

/// GET /api/vms - Current guest snapshots.
pub async fn vms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InventoryQuery>,
) -> Json<Vec<VmSnapshot>> {
    Json(state.orchestrator.list_vms(query.endpoint.as_deref()))
}
