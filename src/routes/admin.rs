use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};
use tracing::{error, info, warn};

use crate::{
    access::{can_assign, TicketScope},
    db::user_repository::CreateUserOutcome,
    errors::ApiError,
    models::{
        activity_log::{ActivityAction, ActivityLogFilter},
        user::{normalize_email, NewUser, UserRole},
    },
    routes::{auth::session::AuthSession, tickets::parse_ticket_id},
    state::AppState,
    utils::{
        ip::ClientIp,
        password::{hash_password, MIN_PASSWORD_LENGTH},
    },
};

pub const DEFAULT_LOG_PAGE_SIZE: i64 = 50;
pub const MAX_LOG_PAGE_SIZE: i64 = 200;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: i64,
    pub total_tickets: i64,
    pub open_tickets: i64,
    pub resolved_tickets: i64,
}

pub async fn stats(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let total_users = app_state.users.count_users().await?;
    let counts = app_state.tickets.ticket_counts().await?;
    let stats = AdminStats {
        total_users,
        total_tickets: counts.total,
        open_tickets: counts.active,
        resolved_tickets: counts.resolved,
    };
    Ok(Json(json!({ "success": true, "stats": stats })).into_response())
}

pub async fn list_users(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let users = app_state.users.list_users().await?;
    Ok(Json(json!({ "success": true, "users": users })).into_response())
}

#[derive(Deserialize)]
pub struct CreateUserPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

pub async fn create_user(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    client_ip: ClientIp,
    Json(payload): Json<CreateUserPayload>,
) -> Result<Response, ApiError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);
    if name.is_empty() || email.is_empty() || payload.password.is_empty() || payload.role.is_empty()
    {
        return Err(ApiError::validation(
            "Name, email, password, and role are required",
        ));
    }
    let role: UserRole = payload
        .role
        .parse()
        .map_err(|_| ApiError::validation("Invalid role. Must be admin, agent, or customer"))?;
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
        email: email.clone(),
        password_hash: Some(password_hash),
        role,
    };
    let user = match app_state.users.create_user(&new_user).await? {
        CreateUserOutcome::Created(user) => user,
        CreateUserOutcome::EmailTaken => {
            return Err(ApiError::conflict("User with this email already exists"))
        }
    };

    app_state
        .activity
        .record(
            Some(claims.id),
            ActivityAction::CreateUser,
            format!("Created user {email} with role {role}"),
            &client_ip,
        )
        .await;
    info!(user_id = user.id, admin_id = claims.id, role = %role, "user created by admin");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": user.to_public(),
        })),
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub action: Option<String>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// `(page, limit, offset)`; unparseable values fall back to the defaults.
fn pagination(query: &ActivityLogQuery) -> (i64, i64, i64) {
    let page = non_empty(&query.page)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = non_empty(&query.limit)
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_LOG_PAGE_SIZE)
        .clamp(1, MAX_LOG_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

/// RFC 3339 timestamp or a bare `YYYY-MM-DD`. A bare end date covers the whole day.
fn parse_date_bound(raw: &str, inclusive_end: bool) -> Option<OffsetDateTime> {
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    let day = Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()?;
    let at = if inclusive_end {
        day.with_hms_nano(23, 59, 59, 999_999_999).ok()?
    } else {
        day.midnight()
    };
    Some(at.assume_utc())
}

fn activity_filter(query: &ActivityLogQuery) -> Result<ActivityLogFilter, ApiError> {
    let user_id = non_empty(&query.user_id)
        .map(|v| v.parse::<i64>())
        .transpose()
        .map_err(|_| ApiError::validation("userId must be a number"))?;
    let start = non_empty(&query.start_date)
        .map(|v| parse_date_bound(v, false).ok_or_else(|| ApiError::validation("Invalid startDate")))
        .transpose()?;
    let end = non_empty(&query.end_date)
        .map(|v| parse_date_bound(v, true).ok_or_else(|| ApiError::validation("Invalid endDate")))
        .transpose()?;

    Ok(ActivityLogFilter {
        action: non_empty(&query.action).map(str::to_string),
        user_id,
        start,
        end,
    })
}

pub async fn activity_logs(
    State(app_state): State<AppState>,
    Query(query): Query<ActivityLogQuery>,
) -> Result<Response, ApiError> {
    let filter = activity_filter(&query)?;
    let (page, limit, offset) = pagination(&query);

    let logs = app_state
        .activity_logs
        .list_activity(&filter, limit, offset)
        .await?;
    let total = app_state.activity_logs.count_activity(&filter).await?;
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(json!({
        "success": true,
        "logs": logs,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "totalPages": total_pages,
        },
    }))
    .into_response())
}

pub async fn list_tickets(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let tickets = app_state.tickets.list_tickets(TicketScope::All).await?;
    Ok(Json(json!({ "success": true, "tickets": tickets })).into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignPayload {
    pub agent_id: Option<i64>,
}

pub async fn assign_ticket(
    State(app_state): State<AppState>,
    session: AuthSession,
    client_ip: ClientIp,
    Path(ticket_id): Path<String>,
    Json(payload): Json<AssignPayload>,
) -> Result<Response, ApiError> {
    let actor = session.actor();
    if !can_assign(&actor) {
        return Err(ApiError::forbidden("Access denied. Admin role required."));
    }
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let agent_id = payload
        .agent_id
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation("Valid agent ID is required"))?;

    let agent = app_state
        .users
        .find_agent_by_id(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agent not found or invalid role"))?;

    let ticket = app_state
        .tickets
        .assign_agent(ticket_id, agent.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    app_state
        .activity
        .record(
            Some(actor.id),
            ActivityAction::AssignTicket,
            format!("Assigned ticket {} to {}", ticket.ticket_number, agent.email),
            &client_ip,
        )
        .await;
    info!(ticket_id, agent_id, admin_id = actor.id, "ticket assigned");

    let warning = app_state
        .notifier
        .ticket_assigned(&ticket, &agent.to_public())
        .await
        .warning();

    Ok(Json(json!({
        "success": true,
        "message": "Ticket assigned successfully",
        "ticket": ticket,
        "warning": warning,
    }))
    .into_response())
}

pub async fn notify_failover(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
    client_ip: ClientIp,
    Json(payload): Json<Value>,
) -> Result<Response, ApiError> {
    let is_active = payload
        .get("isActive")
        .and_then(Value::as_bool)
        .ok_or_else(|| ApiError::validation("isActive must be a boolean"))?;

    let admins = app_state
        .users
        .list_users_by_roles(&[UserRole::Admin])
        .await?;
    let report = app_state.notifier.failover_changed(is_active, &admins).await;
    if report.failed > 0 {
        warn!(failed = report.failed, "some failover notifications were not delivered");
    }

    app_state
        .activity
        .record(
            Some(claims.id),
            ActivityAction::FailoverNotification,
            format!(
                "Failover {} - notifications sent to all admins",
                if is_active { "activated" } else { "deactivated" }
            ),
            &client_ip,
        )
        .await;

    Ok(Json(json!({
        "success": true,
        "message": "Failover notifications sent successfully",
        "failoverActive": is_active,
        "notified": report.attempted - report.failed,
        "warning": report.warning(),
    }))
    .into_response())
}
