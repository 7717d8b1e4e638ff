//! Introspection HTTP routes
//!
//! - `GET /health` - liveness of the gateway process
//! - `GET /debug/vars` - health-check connections and counters
//! - `GET /debug/tablets` - `show vitess_tablets` as JSON

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::exporter::TabletRow;
use crate::gateway::Gateway;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct TabletsResponse {
    pub tablets: Vec<TabletRow>,
    pub total: usize,
}

pub fn health_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}

pub fn debug_routes(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/vars", get(vars_handler))
        .route("/tablets", get(tablets_handler))
        .with_state(gateway)
}

async fn health_handler() -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    (StatusCode::OK, Json(response))
}

async fn vars_handler(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    (StatusCode::OK, Json(gateway.debug_vars()))
}

async fn tablets_handler(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    let tablets: Vec<TabletRow> = gateway
        .registry()
        .snapshot()
        .iter()
        .map(TabletRow::from_health)
        .collect();
    let total = tablets.len();
    (StatusCode::OK, Json(TabletsResponse { tablets, total }))
}
