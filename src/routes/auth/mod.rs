pub mod claims;
pub mod login;
pub mod register;
pub mod session;

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{models::user::UserRole, responses::JsonResponse, state::AppState};
use session::AuthSession;

pub use login::handle_login;
pub use register::handle_register;

async fn role_gate(
    state: &AppState,
    req: Request<Body>,
    next: Next,
    allowed: fn(UserRole) -> bool,
    denied: &str,
) -> Result<Response, Response> {
    let (mut parts, body) = req.into_parts();
    let claims = match AuthSession::from_request_parts(&mut parts, state).await {
        Ok(AuthSession(claims)) => claims,
        Err(rejection) => return Err(rejection.into_response()),
    };

    if !allowed(claims.role) {
        return Err(JsonResponse::forbidden(denied).into_response());
    }

    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

/// Agents and admins.
pub async fn staff_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    role_gate(
        &state,
        req,
        next,
        |role| role.is_staff(),
        "Access denied. Agent or admin role required.",
    )
    .await
}

pub async fn admin_gate(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    role_gate(
        &state,
        req,
        next,
        |role| role == UserRole::Admin,
        "Access denied. Admin role required.",
    )
    .await
}
