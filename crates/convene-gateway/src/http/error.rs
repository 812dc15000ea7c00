use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use convene_sessions::CoordinatorError;
use serde::Serialize;
use tracing::error;

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

/// Coordinator failure rendered as `{code, error}` JSON.
pub struct ApiError(pub CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CoordinatorError::Validation(_) => StatusCode::BAD_REQUEST,
            CoordinatorError::SessionNotFound { .. }
            | CoordinatorError::InterviewerNotFound { .. } => StatusCode::NOT_FOUND,
            CoordinatorError::Conflict { .. } => StatusCode::CONFLICT,
            CoordinatorError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.0.code(), error = %self.0, "request failed");
        }
        let body = ErrorBody {
            code: self.0.code(),
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
