use axum::{
    extract::{Json, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    access::{can_respond, status_after_customer_response},
    db::ticket_repository::CreateTicketOutcome,
    errors::ApiError,
    models::{
        activity_log::ActivityAction,
        ticket::{NewTicket, Ticket, TicketPriority},
        ticket_response::NewTicketResponse,
        user::{normalize_email, UserRole},
    },
    routes::auth::session::AuthSession,
    state::AppState,
    utils::{ip::ClientIp, ticket_number::generate_ticket_number},
};

/// Fresh numbers tried before a create is reported as a conflict.
const TICKET_NUMBER_ATTEMPTS: usize = 3;

pub(crate) fn parse_ticket_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::validation("Invalid ticket ID"))
}

#[derive(Debug, Default)]
struct TicketSubmission {
    name: String,
    email: String,
    subject: String,
    description: String,
    priority: String,
    attachment: Option<(String, Vec<u8>)>,
}

async fn read_submission(
    mut multipart: Multipart,
    max_attachment_bytes: usize,
) -> Result<TicketSubmission, ApiError> {
    let mut submission = TicketSubmission::default();
    let malformed = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e, "malformed ticket submission");
        ApiError::validation("Malformed form data")
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if name == "attachment" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(malformed)?;
            if bytes.len() > max_attachment_bytes {
                return Err(ApiError::validation(format!(
                    "Attachment exceeds the {max_attachment_bytes} byte limit"
                )));
            }
            if !bytes.is_empty() {
                submission.attachment = Some((file_name, bytes.to_vec()));
            }
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "name" => submission.name = value.trim().to_string(),
            "email" => submission.email = normalize_email(&value),
            "subject" => submission.subject = value.trim().to_string(),
            "description" => submission.description = value.trim().to_string(),
            "priority" => submission.priority = value.trim().to_string(),
            _ => {}
        }
    }
    Ok(submission)
}

/// Retries on ticket-number collisions; 409 once every attempt collided.
async fn insert_with_fresh_number(
    app_state: &AppState,
    new_ticket: &mut NewTicket,
) -> Result<Ticket, ApiError> {
    for attempt in 1..=TICKET_NUMBER_ATTEMPTS {
        new_ticket.ticket_number = generate_ticket_number();
        match app_state.tickets.create_ticket(new_ticket).await? {
            CreateTicketOutcome::Created(ticket) => return Ok(ticket),
            CreateTicketOutcome::DuplicateNumber => {
                warn!(attempt, ticket_number = %new_ticket.ticket_number, "ticket number collision");
            }
        }
    }
    Err(ApiError::conflict(
        "Could not allocate a unique ticket number, please retry",
    ))
}

pub async fn create_ticket(
    State(app_state): State<AppState>,
    client_ip: ClientIp,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let submission = read_submission(multipart, app_state.max_attachment_bytes).await?;

    if submission.name.is_empty()
        || submission.email.is_empty()
        || submission.subject.is_empty()
        || submission.description.is_empty()
        || submission.priority.is_empty()
    {
        return Err(ApiError::validation("All required fields must be provided"));
    }
    if !submission.email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }
    let priority: TicketPriority = submission
        .priority
        .parse()
        .map_err(|_| ApiError::validation("Priority must be one of low, medium, high, critical"))?;

    let customer = app_state
        .users
        .find_or_create_customer(&submission.name, &submission.email)
        .await?;

    let attachment_path = match &submission.attachment {
        Some((file_name, bytes)) => Some(
            app_state
                .attachments
                .save(file_name, bytes)
                .await
                .map_err(|e| {
                    error!(error = %e, "failed to store attachment");
                    ApiError::internal()
                })?,
        ),
        None => None,
    };

    let mut new_ticket = NewTicket {
        ticket_number: String::new(),
        customer_id: customer.id,
        subject: submission.subject,
        description: submission.description,
        priority,
        attachment_path,
    };

    let ticket = match insert_with_fresh_number(&app_state, &mut new_ticket).await {
        Ok(ticket) => ticket,
        Err(e) => {
            if let Some(path) = &new_ticket.attachment_path {
                app_state.attachments.discard(path).await;
            }
            return Err(e);
        }
    };

    app_state
        .activity
        .record(
            Some(customer.id),
            ActivityAction::CreateTicket,
            format!("Ticket {} created", ticket.ticket_number),
            &client_ip,
        )
        .await;
    info!(ticket_id = ticket.id, user_id = customer.id, priority = %ticket.priority, "ticket created");

    let staff = match app_state
        .users
        .list_users_by_roles(&[UserRole::Agent, UserRole::Admin])
        .await
    {
        Ok(staff) => staff,
        Err(e) => {
            warn!(error = %e, "could not load staff for new ticket notice");
            Vec::new()
        }
    };
    let report = app_state
        .notifier
        .ticket_created(&ticket, &submission.name, &customer.email, &staff)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Ticket created successfully",
            "ticket_number": ticket.ticket_number,
            "ticket": {
                "id": ticket.id,
                "ticket_number": ticket.ticket_number,
            },
            "warning": report.warning(),
        })),
    )
        .into_response())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    #[serde(default)]
    pub ticket_number: String,
    #[serde(default)]
    pub email: String,
}

pub async fn search_ticket(
    State(app_state): State<AppState>,
    Json(payload): Json<SearchPayload>,
) -> Result<Response, ApiError> {
    let ticket_number = payload.ticket_number.trim();
    let email = normalize_email(&payload.email);
    if ticket_number.is_empty() || email.is_empty() {
        return Err(ApiError::validation("Ticket number and email are required"));
    }

    let ticket = app_state
        .tickets
        .find_ticket_by_number_and_email(ticket_number, &email)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(
                "Ticket not found. Please check your ticket number and email address.",
            )
        })?;

    Ok(Json(json!({ "success": true, "ticket": ticket })).into_response())
}

pub async fn list_responses(
    State(app_state): State<AppState>,
    Path(ticket_id): Path<String>,
) -> Result<Response, ApiError> {
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let responses = app_state.tickets.list_responses(ticket_id).await?;
    Ok(Json(json!({ "success": true, "responses": responses })).into_response())
}

#[derive(Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub response: String,
}

pub async fn customer_respond(
    State(app_state): State<AppState>,
    session: AuthSession,
    client_ip: ClientIp,
    Path(ticket_id): Path<String>,
    Json(payload): Json<ResponsePayload>,
) -> Result<Response, ApiError> {
    let actor = session.actor();
    if actor.role != UserRole::Customer {
        return Err(ApiError::forbidden("Access denied. Customer role required."));
    }
    let ticket_id = parse_ticket_id(&ticket_id)?;
    let text = payload.response.trim();
    if text.is_empty() {
        return Err(ApiError::validation("Response content is required"));
    }

    let not_found = || ApiError::not_found("Ticket not found or access denied");
    let ticket = app_state
        .tickets
        .find_ticket(ticket_id)
        .await?
        .ok_or_else(not_found)?;
    if !can_respond(&actor, &ticket) {
        return Err(not_found());
    }

    let saved = app_state
        .tickets
        .add_response(&NewTicketResponse {
            ticket_id,
            author_id: actor.id,
            response: text.to_string(),
        })
        .await?;

    let next_status = status_after_customer_response(ticket.status);
    let ticket = if next_status != ticket.status {
        match app_state
            .tickets
            .transition_status(ticket_id, ticket.status, next_status)
            .await?
        {
            Some(updated) => updated,
            // Someone else moved it first; report what is stored now.
            None => app_state
                .tickets
                .find_ticket(ticket_id)
                .await?
                .ok_or_else(not_found)?,
        }
    } else {
        ticket
    };

    app_state
        .activity
        .record(
            Some(actor.id),
            ActivityAction::CustomerResponse,
            format!("Customer responded to ticket {}", ticket.ticket_number),
            &client_ip,
        )
        .await;
    info!(ticket_id, user_id = actor.id, status = %ticket.status, "customer responded");

    let mut warning = None;
    if let Some(agent_id) = ticket.assigned_agent_id {
        match app_state.users.find_user_by_id(agent_id).await {
            Ok(Some(agent)) => {
                let customer_name = app_state
                    .users
                    .find_user_by_id(actor.id)
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u.name)
                    .unwrap_or_else(|| session.0.email.clone());
                warning = app_state
                    .notifier
                    .customer_responded(&ticket, &agent.email, &customer_name, text)
                    .await
                    .warning();
            }
            Ok(None) => {}
            Err(e) => warn!(ticket_id, error = %e, "could not load assigned agent for notice"),
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "Response sent successfully",
        "response": saved,
        "ticket_status": ticket.status,
        "warning": warning,
    }))
    .into_response())
}

pub async fn my_tickets(
    State(app_state): State<AppState>,
    AuthSession(claims): AuthSession,
) -> Result<Response, ApiError> {
    let tickets = app_state.tickets.list_tickets_for_email(&claims.email).await?;
    Ok(Json(json!({ "success": true, "tickets": tickets })).into_response())
}
