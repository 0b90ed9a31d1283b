use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    db::user_repository::CreateUserOutcome,
    errors::ApiError,
    models::{
        activity_log::ActivityAction,
        user::{normalize_email, NewUser, UserRole},
    },
    state::AppState,
    utils::{
        ip::ClientIp,
        password::{hash_password, MIN_PASSWORD_LENGTH},
    },
};

#[derive(Deserialize)]
pub struct RegisterPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn handle_register(
    State(app_state): State<AppState>,
    client_ip: ClientIp,
    Json(payload): Json<RegisterPayload>,
) -> Result<Response, ApiError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);
    if name.is_empty() || email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation(
            "Name, email, and password are required",
        ));
    }
    if !email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        ApiError::internal()
    })?;

    let new_user = NewUser {
        name: name.to_string(),
        email,
        password_hash: Some(password_hash),
        role: UserRole::Customer,
    };
    // Ticket-created accounts have no password; they stay unclaimable here.
    let user = match app_state.users.create_user(&new_user).await? {
        CreateUserOutcome::Created(user) => user,
        CreateUserOutcome::EmailTaken => {
            return Err(ApiError::conflict("User with this email already exists"))
        }
    };

    app_state
        .activity
        .record(
            Some(user.id),
            ActivityAction::Register,
            "New user registered",
            &client_ip,
        )
        .await;
    info!(user_id = user.id, "customer registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": user.to_public(),
        })),
    )
        .into_response())
}
