use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::aliases::DieselError;

/// Failure taxonomy for every operation boundary. Nothing below this type
/// escapes to the caller: handlers return `Result<_, AppError>` and the
/// `IntoResponse` impl converts each variant into the tagged `{error}` shape.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation failure. No mutation was attempted.
    #[error("{0}")]
    BadRequest(String),
    /// The targeted row does not exist (zero affected rows / empty result),
    /// reported distinctly so the caller can show "already removed" instead
    /// of a generic failure.
    #[error("Resource not found")]
    NotFound,
    /// Storage or other internal failure. Logged with context, surfaced as a
    /// generic message; internal error text must not leak to the caller.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            AppError::Other(err) => {
                tracing::error!("Internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Standard success envelope: `data` carries the payload, `message` a short
/// human-readable confirmation. Errors never use this shape.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T: Serialize, M: Serialize> IntoResponse for StdResponse<T, M> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
