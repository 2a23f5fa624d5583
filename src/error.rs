use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Request-level failure taxonomy. Only validation messages and the
/// invalid-credential case carry specifics to the caller; upstream failures
/// are logged and replaced with a fixed generic body so provider details
/// never leak.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid API key")]
    InvalidCredential,
    #[error("invalid email or password")]
    Unauthorized,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    ProviderFetch(anyhow::Error),
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidCredential => (
                StatusCode::UNAUTHORIZED,
                "Invalid API key. Please check your key and try again.".to_string(),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password. Please try again.".to_string(),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::ProviderFetch(err) => {
                tracing::error!("provider fetch failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to fetch care providers. Please try again.".to_string(),
                )
            }
            ApiError::Internal(err) => {
                tracing::error!("internal error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
