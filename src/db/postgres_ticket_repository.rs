use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::access::{TicketScope, PRIORITY_ORDER_SQL};
use crate::db::ticket_repository::{CreateTicketOutcome, TicketCounts, TicketRepository};
use crate::models::ticket::{NewTicket, Ticket, TicketStatus, TicketSummary};
use crate::models::ticket_response::{NewTicketResponse, TicketResponse, TicketResponseView};

const TICKET_COLUMNS: &str = "id, ticket_number, customer_id, subject, description, priority, \
     status, assigned_agent_id, attachment_path, created_at, updated_at";

pub struct PostgresTicketRepository {
    pub pool: PgPool,
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<CreateTicketOutcome, sqlx::Error> {
        let result = sqlx::query_as::<_, Ticket>(&format!(
            r#"
            INSERT INTO tickets (
                ticket_number, customer_id, subject, description, priority, status, attachment_path
            )
            VALUES ($1, $2, $3, $4, $5, 'open', $6)
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(&ticket.ticket_number)
        .bind(ticket.customer_id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.priority.as_str())
        .bind(ticket.attachment_path.as_deref())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(CreateTicketOutcome::Created(created)),
            Err(err)
                if err
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation()) =>
            {
                Ok(CreateTicketOutcome::DuplicateNumber)
            }
            Err(err) => Err(err),
        }
    }

    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1"
        ))
        .bind(ticket_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_ticket_by_number_and_email(
        &self,
        ticket_number: &str,
        email: &str,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT t.id, t.ticket_number, t.customer_id, t.subject, t.description, t.priority,
                   t.status, t.assigned_agent_id, t.attachment_path, t.created_at, t.updated_at
            FROM tickets t
            JOIN users u ON u.id = t.customer_id
            WHERE t.ticket_number = $1 AND u.email = $2
            "#,
        )
        .bind(ticket_number)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<TicketSummary>, sqlx::Error> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.id, t.ticket_number, t.customer_id, t.subject, t.description, t.priority,
                   t.status, t.assigned_agent_id, t.attachment_path, t.created_at, t.updated_at,
                   c.name AS customer_name,
                   c.email AS customer_email,
                   a.name AS assigned_agent_name
            FROM tickets t
            JOIN users c ON c.id = t.customer_id
            LEFT JOIN users a ON a.id = t.assigned_agent_id
            "#,
        );

        match scope {
            TicketScope::All => {}
            TicketScope::AgentQueue(agent_id) => {
                qb.push(" WHERE (t.assigned_agent_id IS NULL OR t.assigned_agent_id = ");
                qb.push_bind(agent_id);
                qb.push(")");
            }
            TicketScope::OwnedBy(customer_id) => {
                qb.push(" WHERE t.customer_id = ");
                qb.push_bind(customer_id);
            }
        }

        qb.push(" ORDER BY ");
        qb.push(PRIORITY_ORDER_SQL);

        qb.build_query_as::<TicketSummary>()
            .fetch_all(&self.pool)
            .await
    }

    async fn list_tickets_for_email(&self, email: &str) -> Result<Vec<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(
            r#"
            SELECT t.id, t.ticket_number, t.customer_id, t.subject, t.description, t.priority,
                   t.status, t.assigned_agent_id, t.attachment_path, t.created_at, t.updated_at
            FROM tickets t
            JOIN users u ON u.id = t.customer_id
            WHERE u.email = $1
            ORDER BY t.created_at DESC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await
    }

    async fn update_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    async fn transition_status(
        &self,
        ticket_id: i64,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
    }

    async fn assign_agent(
        &self,
        ticket_id: i64,
        agent_id: i64,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        sqlx::query_as::<_, Ticket>(&format!(
            r#"
            UPDATE tickets
            SET assigned_agent_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "#
        ))
        .bind(ticket_id)
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn add_response(
        &self,
        response: &NewTicketResponse,
    ) -> Result<TicketResponse, sqlx::Error> {
        sqlx::query_as::<_, TicketResponse>(
            r#"
            INSERT INTO ticket_responses (ticket_id, agent_id, response)
            VALUES ($1, $2, $3)
            RETURNING id, ticket_id, agent_id, response, created_at
            "#,
        )
        .bind(response.ticket_id)
        .bind(response.author_id)
        .bind(&response.response)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_responses(&self, ticket_id: i64) -> Result<Vec<TicketResponseView>, sqlx::Error> {
        sqlx::query_as::<_, TicketResponseView>(
            r#"
            SELECT r.id, r.response, r.created_at,
                   u.name AS agent_name,
                   u.role AS agent_role
            FROM ticket_responses r
            JOIN users u ON u.id = r.agent_id
            WHERE r.ticket_id = $1
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn ticket_counts(&self) -> Result<TicketCounts, sqlx::Error> {
        let (total, active, resolved) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status IN ('open', 'pending')),
                   COUNT(*) FILTER (WHERE status = 'resolved')
            FROM tickets
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TicketCounts {
            total,
            active,
            resolved,
        })
    }
}
