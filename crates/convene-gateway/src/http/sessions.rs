//! Session endpoints.
//!
//! | Method | Path                            | Body                          |
//! |--------|---------------------------------|-------------------------------|
//! | POST   | `/sessions`                     | `NewSession`                  |
//! | GET    | `/sessions/{id}`                | none                          |
//! | POST   | `/sessions/{id}/availability`   | `{interviewer_id, ranges}`    |
//! | POST   | `/sessions/{id}/cancel`         | none                          |
//! | POST   | `/sessions/{id}/acknowledge`    | `{interviewer_id}`            |
//!
//! Errors come back as `{"code": "...", "error": "..."}` with 400/404/409/500;
//! unreadable bodies are 400 `VALIDATION_ERROR`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use convene_core::types::{Assignment, InterviewSession, InterviewerId, SessionId, TimeRange};
use convene_sessions::{NewSession, SessionView, SubmitOutcome};
use serde::Deserialize;

use super::error::ApiError;
use super::json::ApiJson;
use crate::app::AppState;

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub interviewer_id: InterviewerId,
    pub ranges: Vec<TimeRange>,
}

#[derive(Deserialize)]
pub struct AcknowledgeRequest {
    pub interviewer_id: InterviewerId,
}

/// POST /sessions: create a `PENDING` session.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<NewSession>,
) -> Result<(StatusCode, Json<InterviewSession>), ApiError> {
    let session = state.coordinator.create_session(req)?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /sessions/{id}: session, assignments and schedule if confirmed.
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.coordinator.get_session_view(&SessionId::from(id))?))
}

/// POST /sessions/{id}/availability: record one interviewer's ranges.
pub async fn submit_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AvailabilityRequest>,
) -> Result<Json<SubmitOutcome>, ApiError> {
    let outcome = state
        .coordinator
        .submit_availability(&SessionId::from(id), &req.interviewer_id, req.ranges)
        .await?;
    Ok(Json(outcome))
}

/// POST /sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<InterviewSession>, ApiError> {
    let session = state
        .coordinator
        .cancel_session(&SessionId::from(id))
        .await?;
    Ok(Json(session))
}

/// POST /sessions/{id}/acknowledge: interviewer accepts the confirmed slot.
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AcknowledgeRequest>,
) -> Result<Json<Assignment>, ApiError> {
    let assignment = state
        .coordinator
        .acknowledge(&SessionId::from(id), &req.interviewer_id)
        .await?;
    Ok(Json(assignment))
}
