use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use convene_sessions::CoordinatorError;
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// `Json<T>` whose rejections render as `VALIDATION_ERROR` instead of
/// axum's plain-text 4xx bodies.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_to_error(rejection)),
        }
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    ApiError(CoordinatorError::Validation(rejection.body_text()))
}
