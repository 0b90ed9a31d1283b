use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    db::system_status_repository::StatusUpdateOutcome,
    errors::ApiError,
    models::{
        activity_log::ActivityAction,
        system_status::{SystemStatus, SystemStatusUpdate},
        user::UserRole,
    },
    routes::auth::session::AuthSession,
    state::AppState,
    utils::ip::ClientIp,
};

pub async fn get_status(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let status = app_state
        .system_status
        .get_status()
        .await?
        .unwrap_or_else(SystemStatus::unseeded);
    Ok(Json(status).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub primary_system_status: Option<String>,
    pub failover_activated: Option<bool>,
    pub expected_version: Option<i64>,
}

pub async fn update_status(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    client_ip: ClientIp,
    Json(payload): Json<StatusUpdatePayload>,
) -> Result<Response, ApiError> {
    if claims.role != UserRole::Admin {
        return Err(ApiError::forbidden("Access denied. Admin role required."));
    }
    let failover_activated = payload
        .failover_activated
        .ok_or_else(|| ApiError::validation("failoverActivated must be a boolean"))?;
    let primary_system_status = match payload.primary_system_status.as_deref().map(str::trim) {
        Some("") => return Err(ApiError::validation("primarySystemStatus cannot be empty")),
        Some(status) => status.to_string(),
        None if failover_activated => "offline".to_string(),
        None => "online".to_string(),
    };

    let update = SystemStatusUpdate {
        primary_system_status,
        failover_activated,
        expected_version: payload.expected_version,
    };

    let status = match app_state.system_status.update_status(&update).await? {
        StatusUpdateOutcome::Updated(status) => status,
        StatusUpdateOutcome::VersionConflict(current) => {
            return Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "status": "error",
                    "success": false,
                    "message": "System status was changed by someone else; reload and retry",
                    "current": current,
                })),
            )
                .into_response());
        }
    };

    app_state
        .activity
        .record(
            Some(claims.id),
            ActivityAction::FailoverToggle,
            format!(
                "Failover {} (primary system {})",
                if status.failover_activated { "activated" } else { "deactivated" },
                status.primary_system_status
            ),
            &client_ip,
        )
        .await;
    info!(
        admin_id = claims.id,
        failover = status.failover_activated,
        version = status.version,
        "system status updated"
    );

    let admins = match app_state
        .users
        .list_users_by_roles(&[UserRole::Admin])
        .await
    {
        Ok(admins) => admins,
        Err(e) => {
            warn!(error = %e, "could not load admins for failover broadcast");
            Vec::new()
        }
    };
    let report = app_state
        .notifier
        .failover_changed(status.failover_activated, &admins)
        .await;

    Ok(Json(json!({
        "success": true,
        "message": "System status updated successfully",
        "systemStatus": status,
        "warning": report.warning(),
    }))
    .into_response())
}
