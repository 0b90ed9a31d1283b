use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::models::user::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TicketResponse {
    pub id: i64,
    pub ticket_id: i64,
    /// Author of the response. Customers write here too; the column name predates that.
    pub agent_id: i64,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Conversation entry as shown in a ticket thread.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TicketResponseView {
    pub id: i64,
    pub response: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub agent_name: String,
    #[sqlx(try_from = "String")]
    pub agent_role: UserRole,
}

#[derive(Debug, Clone)]
pub struct NewTicketResponse {
    pub ticket_id: i64,
    pub author_id: i64,
    pub response: String,
}
