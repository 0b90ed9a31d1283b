use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
    pub code: Option<String>,
}

impl JsonResponse {
    fn with_status(status: StatusCode, msg: &str) -> impl IntoResponse {
        let ok = status.is_success();
        (
            status,
            Json(JsonResponse {
                status: if ok { "success" } else { "error" }.to_string(),
                success: ok,
                message: msg.to_string(),
                code: None,
            }),
        )
    }

    pub fn not_found(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn unauthorized(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn too_many_requests(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn forbidden(msg: &str) -> impl IntoResponse {
        Self::with_status(StatusCode::FORBIDDEN, msg)
    }
}
