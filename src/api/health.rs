//! Health check endpoint handler.

use crate::api::AppState;
use crate::registry::ConnectionStatus;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub connections: ConnectionCounts,
    pub nodes: usize,
    pub vms: usize,
}

/// Endpoint connection counts.
#[derive(Debug, Serialize)]
pub struct ConnectionCounts {
    pub total: usize,
    pub connected: usize,
    pub error: usize,
}

/// GET /health - Return system health status.
pub async fn handle(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connections = state.orchestrator.list_connections();
    let connected = connections
        .iter()
        .filter(|c| c.status == ConnectionStatus::Connected)
        .count();
    let error = connections
        .iter()
        .filter(|c| c.status == ConnectionStatus::Error)
        .count();

    let status = match (connected, connections.len()) {
        (c, t) if c == t && t > 0 => "healthy",
        (c, _) if c > 0 => "degraded",
        (_, 0) => "idle",
        _ => "unhealthy",
    };

    let snapshot = state.orchestrator.snapshot();

    Json(HealthResponse {
        status: status.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        connections: ConnectionCounts {
            total: connections.len(),
            connected,
            error,
        },
        nodes: snapshot.nodes.len(),
        vms: snapshot.vms.len(),
    })
}
