use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    errors::ApiError,
    models::{activity_log::ActivityAction, user::normalize_email},
    state::AppState,
    utils::{ip::ClientIp, jwt::issue_token, password::verify_password},
};

#[derive(Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid credentials".into())
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    client_ip: ClientIp,
    Json(payload): Json<LoginPayload>,
) -> Result<Response, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = app_state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    // Accounts provisioned from an anonymous ticket have no password until registered.
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(invalid_credentials());
    };

    match verify_password(&payload.password, hash) {
        Ok(true) => {}
        Ok(false) => return Err(invalid_credentials()),
        Err(e) => {
            error!(user_id = user.id, error = %e, "password verification failed");
            return Err(ApiError::internal());
        }
    }

    app_state.users.record_login(user.id).await?;

    let token = issue_token(&user, &app_state).map_err(|e| {
        error!(user_id = user.id, error = %e, "token generation failed");
        ApiError::internal()
    })?;

    app_state
        .activity
        .record(Some(user.id), ActivityAction::Login, "User logged in", &client_ip)
        .await;
    info!(user_id = user.id, role = %user.role, "user logged in");

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "user": user.to_public(),
    }))
    .into_response())
}
