use async_trait::async_trait;
use serde::Serialize;

use crate::access::TicketScope;
use crate::models::ticket::{NewTicket, Ticket, TicketStatus, TicketSummary};
use crate::models::ticket_response::{NewTicketResponse, TicketResponse, TicketResponseView};

#[derive(Debug, Clone)]
pub enum CreateTicketOutcome {
    Created(Ticket),
    DuplicateNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TicketCounts {
    pub total: i64,
    /// Open or pending.
    pub active: i64,
    pub resolved: i64,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<CreateTicketOutcome, sqlx::Error>;
    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, sqlx::Error>;
    async fn find_ticket_by_number_and_email(
        &self,
        ticket_number: &str,
        email: &str,
    ) -> Result<Option<Ticket>, sqlx::Error>;
    /// Tickets inside `scope`, ranked by priority then newest first.
    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<TicketSummary>, sqlx::Error>;
    /// Tickets owned by the customer with this email, newest first.
    async fn list_tickets_for_email(&self, email: &str) -> Result<Vec<Ticket>, sqlx::Error>;
    async fn update_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error>;
    /// Moves the ticket to `to` only while it is still in `from`.
    async fn transition_status(
        &self,
        ticket_id: i64,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error>;
    async fn assign_agent(&self, ticket_id: i64, agent_id: i64)
        -> Result<Option<Ticket>, sqlx::Error>;
    async fn add_response(
        &self,
        response: &NewTicketResponse,
    ) -> Result<TicketResponse, sqlx::Error>;
    /// Conversation order: oldest first.
    async fn list_responses(&self, ticket_id: i64) -> Result<Vec<TicketResponseView>, sqlx::Error>;
    async fn ticket_counts(&self) -> Result<TicketCounts, sqlx::Error>;
}
