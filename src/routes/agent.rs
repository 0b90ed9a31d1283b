use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    access::{can_respond, can_transition, ticket_scope},
    errors::ApiError,
    models::{
        activity_log::ActivityAction,
        ticket::{Ticket, TicketStatus},
        ticket_response::NewTicketResponse,
        user::UserRole,
    },
    routes::{auth::session::AuthSession, tickets::parse_ticket_id},
    state::AppState,
    utils::ip::ClientIp,
};

pub async fn list_tickets(
    State(app_state): State<AppState>,
    session: AuthSession,
) -> Result<Response, ApiError> {
    let tickets = app_state
        .tickets
        .list_tickets(ticket_scope(&session.actor()))
        .await?;
    Ok(Json(json!({ "success": true, "tickets": tickets })).into_response())
}

pub async fn list_agents(State(app_state): State<AppState>) -> Result<Response, ApiError> {
    let agents = app_state
        .users
        .list_users_by_roles(&[UserRole::Agent])
        .await?;
    Ok(Json(json!({ "success": true, "users": agents })).into_response())
}

pub async fn profile(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Response, ApiError> {
    let user = app_state
        .users
        .find_user_by_id(claims.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(json!({ "success": true, "user": user.to_public() })).into_response())
}

/// Best effort: a missing or unreadable customer only costs the email.
async fn notify_customer(app_state: &AppState, ticket: &Ticket, response: Option<&str>) -> Option<String> {
    match app_state.users.find_user_by_id(ticket.customer_id).await {
        Ok(Some(customer)) => app_state
            .notifier
            .ticket_updated(ticket, &customer.name, &customer.email, response)
            .await
            .warning(),
        Ok(None) => None,
        Err(e) => {
            warn!(ticket_id = ticket.id, error = %e, "could not load customer for ticket update");
            None
        }
    }
}

#[derive(Deserialize)]
pub struct AgentResponsePayload {
    #[serde(default)]
    pub response: String,
    pub status: Option<String>,
}

pub async fn respond(
    State(app_state): State<AppState>,
    session: AuthSession,
    client_ip: ClientIp,
    Path(ticket_id): Path<String>,
    Json(payload): Json<AgentResponsePayload>,
) -> Result<Response, ApiError> {
    let actor = session.actor();
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let text = payload.response.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Response is required"));
    }

    let mut ticket = app_state
        .tickets
        .find_ticket(ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
    if !can_respond(&actor, &ticket) {
        return Err(ApiError::forbidden(
            "You can only respond to tickets assigned to you",
        ));
    }

    // An unrecognised status is ignored rather than rejected.
    let requested_status = payload
        .status
        .as_deref()
        .and_then(|s| s.parse::<TicketStatus>().ok());

    let saved = app_state
        .tickets
        .add_response(&NewTicketResponse {
            ticket_id,
            author_id: actor.id,
            response: text.to_string(),
        })
        .await?;

    if let Some(status) = requested_status.filter(|s| can_transition(&actor, &ticket, *s)) {
        if let Some(updated) = app_state.tickets.update_status(ticket_id, status).await? {
            ticket = updated;
        }
    }

    app_state
        .activity
        .record(
            Some(actor.id),
            ActivityAction::RespondToTicket,
            format!("Responded to ticket {}", ticket.ticket_number),
            &client_ip,
        )
        .await;
    info!(ticket_id, user_id = actor.id, status = %ticket.status, "staff responded to ticket");

    let warning = notify_customer(&app_state, &ticket, Some(text)).await;

    Ok(Json(json!({
        "success": true,
        "message": "Response sent successfully",
        "response": saved,
        "ticket_status": ticket.status,
        "warning": warning,
    }))
    .into_response())
}

#[derive(Deserialize)]
pub struct StatusPayload {
    #[serde(default)]
    pub status: String,
}

pub async fn update_status(
    State(app_state): State<AppState>,
    session: AuthSession,
    client_ip: ClientIp,
    Path(ticket_id): Path<String>,
    Json(payload): Json<StatusPayload>,
) -> Result<Response, ApiError> {
    let actor = session.actor();
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let status: TicketStatus = payload
        .status
        .parse()
        .map_err(|_| ApiError::validation("Status must be one of open, pending, resolved"))?;

    let ticket = app_state
        .tickets
        .find_ticket(ticket_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;
    if !can_transition(&actor, &ticket, status) {
        return Err(ApiError::forbidden(
            "You can only update tickets assigned to you",
        ));
    }

    let ticket = app_state
        .tickets
        .update_status(ticket_id, status)
        .await?
        .ok_or_else(|| ApiError::not_found("Ticket not found"))?;

    app_state
        .activity
        .record(
            Some(actor.id),
            ActivityAction::UpdateTicketStatus,
            format!("Updated ticket {} status to {}", ticket.ticket_number, status),
            &client_ip,
        )
        .await;
    info!(ticket_id, user_id = actor.id, status = %status, "ticket status updated");

    let warning = notify_customer(&app_state, &ticket, None).await;

    Ok(Json(json!({
        "success": true,
        "message": "Ticket status updated successfully",
        "ticket": ticket,
        "warning": warning,
    }))
    .into_response())
}
