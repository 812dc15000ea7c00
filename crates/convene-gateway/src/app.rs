use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use convene_core::config::ConveneConfig;
use convene_sessions::SessionCoordinator;

/// Central shared state, passed as `Arc<AppState>` to all Axum handlers.
pub struct AppState {
    pub config: ConveneConfig,
    pub coordinator: Arc<SessionCoordinator>,
}

impl AppState {
    pub fn new(config: ConveneConfig, coordinator: Arc<SessionCoordinator>) -> Self {
        Self {
            config,
            coordinator,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    use crate::http::{health, sessions};

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/{id}", get(sessions::get_session))
        .route("/sessions/{id}/availability", post(sessions::submit_availability))
        .route("/sessions/{id}/cancel", post(sessions::cancel_session))
        .route("/sessions/{id}/acknowledge", post(sessions::acknowledge))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
