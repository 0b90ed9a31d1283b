//! Role and ownership rules for tickets.
//!
//! Everything here is pure: handlers load the ticket, ask these functions for
//! a decision and map a denial to 403/404 themselves. The repositories use
//! [`TicketScope`] to push the visibility rule into SQL, and the in-memory
//! test store uses [`TicketScope::includes`] for the same rule.

use std::cmp::Ordering;

use crate::models::ticket::{Ticket, TicketStatus};
use crate::models::user::UserRole;
use crate::routes::auth::claims::Claims;

/// The authenticated user a decision is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub role: UserRole,
}

impl Actor {
    pub fn new(id: i64, role: UserRole) -> Self {
        Self { id, role }
    }
}

impl From<&Claims> for Actor {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
        }
    }
}

/// Which tickets an actor may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketScope {
    All,
    /// The unassigned pool plus tickets assigned to this agent.
    AgentQueue(i64),
    OwnedBy(i64),
}

impl TicketScope {
    pub fn includes(&self, ticket: &Ticket) -> bool {
        match *self {
            TicketScope::All => true,
            TicketScope::AgentQueue(agent_id) => ticket
                .assigned_agent_id
                .is_none_or(|assigned| assigned == agent_id),
            TicketScope::OwnedBy(customer_id) => ticket.customer_id == customer_id,
        }
    }
}

pub fn ticket_scope(actor: &Actor) -> TicketScope {
    match actor.role {
        UserRole::Admin => TicketScope::All,
        UserRole::Agent => TicketScope::AgentQueue(actor.id),
        UserRole::Customer => TicketScope::OwnedBy(actor.id),
    }
}

pub fn visible_tickets<'a, I>(actor: &Actor, tickets: I) -> Vec<&'a Ticket>
where
    I: IntoIterator<Item = &'a Ticket>,
{
    let scope = ticket_scope(actor);
    tickets.into_iter().filter(|t| scope.includes(t)).collect()
}

/// Anonymous lookup: both the ticket number and the submitter's email must match.
pub fn matches_lookup(
    ticket_number: &str,
    owner_email: &str,
    requested_number: &str,
    requested_email: &str,
) -> bool {
    ticket_number == requested_number.trim() && owner_email == requested_email.trim()
}

/// Admins, or the agent the ticket is assigned to.
fn is_ticket_handler(actor: &Actor, ticket: &Ticket) -> bool {
    match actor.role {
        UserRole::Admin => true,
        UserRole::Agent => ticket.assigned_agent_id == Some(actor.id),
        UserRole::Customer => false,
    }
}

pub fn can_respond(actor: &Actor, ticket: &Ticket) -> bool {
    match actor.role {
        UserRole::Customer => ticket.customer_id == actor.id,
        _ => is_ticket_handler(actor, ticket),
    }
}

pub fn can_assign(actor: &Actor) -> bool {
    actor.role == UserRole::Admin
}

/// The state machine itself allows every move between the three states, so
/// only the actor is checked. Customers never transition explicitly.
pub fn can_transition(actor: &Actor, ticket: &Ticket, _new_status: TicketStatus) -> bool {
    is_ticket_handler(actor, ticket)
}

/// Status a ticket ends up in after its customer replies. Applied by the
/// system, not subject to [`can_transition`].
pub fn status_after_customer_response(current: TicketStatus) -> TicketStatus {
    match current {
        TicketStatus::Open => TicketStatus::Pending,
        other => other,
    }
}

/// Orders by priority rank ascending, newest first within a rank.
pub fn compare_by_priority(a: &Ticket, b: &Ticket) -> Ordering {
    a.priority
        .rank()
        .cmp(&b.priority.rank())
        .then_with(|| b.created_at.cmp(&a.created_at))
}

pub fn rank_by_priority<T, F>(items: &mut [T], ticket: F)
where
    F: Fn(&T) -> &Ticket,
{
    items.sort_by(|a, b| compare_by_priority(ticket(a), ticket(b)));
}

/// The `ORDER BY` fragment listing endpoints use; must agree with [`compare_by_priority`].
pub const PRIORITY_ORDER_SQL: &str = "CASE t.priority \
     WHEN 'critical' THEN 1 \
     WHEN 'high' THEN 2 \
     WHEN 'medium' THEN 3 \
     WHEN 'low' THEN 4 \
     ELSE 5 END, t.created_at DESC";
