use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::responses::JsonResponse;

/// Failure taxonomy shared by every handler. Each variant carries the
/// user-facing message returned in the JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Dependency(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn internal() -> Self {
        ApiError::Dependency("Internal server error".to_string())
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        error!(?err, "database operation failed");
        ApiError::internal()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(msg) => JsonResponse::bad_request(msg).into_response(),
            ApiError::Unauthenticated(msg) => JsonResponse::unauthorized(msg).into_response(),
            ApiError::Forbidden(msg) => JsonResponse::forbidden(msg).into_response(),
            ApiError::NotFound(msg) => JsonResponse::not_found(msg).into_response(),
            ApiError::Conflict(msg) => JsonResponse::conflict(msg).into_response(),
            ApiError::Dependency(msg) => JsonResponse::server_error(msg).into_response(),
        }
    }
}
