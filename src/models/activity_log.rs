use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Tags written to `activity_logs.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Register,
    Login,
    CreateTicket,
    CustomerResponse,
    RespondToTicket,
    UpdateTicketStatus,
    AssignTicket,
    CreateUser,
    FailoverToggle,
    FailoverNotification,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Register => "register",
            ActivityAction::Login => "login",
            ActivityAction::CreateTicket => "create_ticket",
            ActivityAction::CustomerResponse => "customer_response",
            ActivityAction::RespondToTicket => "respond_to_ticket",
            ActivityAction::UpdateTicketStatus => "update_ticket_status",
            ActivityAction::AssignTicket => "assign_ticket",
            ActivityAction::CreateUser => "create_user",
            ActivityAction::FailoverToggle => "failover_toggle",
            ActivityAction::FailoverNotification => "failover_notification",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewActivityLog {
    pub user_id: Option<i64>,
    pub action: ActivityAction,
    pub details: String,
    pub ip_address: String,
}

/// Log row joined with its (possibly deleted) user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct ActivityLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityLogFilter {
    pub action: Option<String>,
    pub user_id: Option<i64>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

impl ActivityLogFilter {
    pub fn matches(&self, entry: &ActivityLogEntry) -> bool {
        self.action.as_deref().is_none_or(|a| a == entry.action)
            && self.user_id.is_none_or(|id| entry.user_id == Some(id))
            && self.start.is_none_or(|start| entry.created_at >= start)
            && self.end.is_none_or(|end| entry.created_at <= end)
    }
}
