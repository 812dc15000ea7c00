use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let engine = &state.config.engine;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "granularity_minutes": engine.granularity_minutes,
        "reconcile_pending": engine.reconcile_pending,
    }))
}
