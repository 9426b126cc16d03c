//! # Downstream API surface
//!
//! HTTP endpoints exposed to the dashboard layer (pages, forms, tables
//! live elsewhere; this is their data plane).
//!
//! ## Endpoints
//!
//! - `GET  /api/connections` / `POST /api/connections` - list/register endpoints
//! - `DELETE /api/connections/:id` - remove an endpoint and all its state
//! - `POST /api/connections/:id/test` - authenticate + probe
//! - `POST /api/connections/:id/refresh` - poll immediately
//! - `GET  /api/nodes`, `GET /api/vms` - current snapshots
//! - `POST /api/actions`, `POST /api/actions/batch` - command dispatch
//! - `GET  /api/alerts` plus acknowledge/resolve/delete - alert records
//! - `GET  /ws` - snapshot-then-stream subscription feed
//! - `GET  /health`, `GET /metrics` - liveness and Prometheus metrics
//!
//! ## Error Handling
//!
//! Failing calls answer with a uniform envelope:
//! ```json
//! {
//!   "error": {
//!     "message": "endpoint not found: pve9",
//!     "code": "not_found"
//!   }
//! }
//! ```
//! Per-target command failures are not HTTP errors; they are carried
//! inside the batch results.

mod actions;
mod alerts;
mod connections;
pub mod error;
mod health;
mod inventory;
mod ws;

pub use error::{ApiError, ApiErrorBody};

use crate::orchestrator::Orchestrator;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (1 MB). Batch bodies are small; nothing
/// here streams uploads.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Server startup time for uptime tracking
    pub start_time: Instant,
    /// Prometheus handle for rendering /metrics
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            orchestrator,
            start_time: Instant::now(),
            prometheus,
        }
    }
}

/// Build the router with every downstream endpoint.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::handle))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws::handler))
        .route(
            "/api/connections",
            get(connections::list).post(connections::add),
        )
        .route("/api/connections/:id", delete(connections::remove))
        .route("/api/connections/:id/test", post(connections::test))
        .route("/api/connections/:id/refresh", post(connections::refresh))
        .route("/api/nodes", get(inventory::nodes))
        .route("/api/vms", get(inventory::vms))
        .route("/api/actions", post(actions::dispatch))
        .route("/api/actions/batch", post(actions::dispatch_batch))
        .route("/api/alerts", get(alerts::list))
        .route("/api/alerts/:id", delete(alerts::delete))
        .route("/api/alerts/:id/acknowledge", post(alerts::acknowledge))
        .route("/api/alerts/:id/resolve", post(alerts::resolve))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /metrics - Prometheus text exposition.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
