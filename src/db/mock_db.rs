use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::access::{matches_lookup, rank_by_priority, TicketScope};
use crate::db::activity_log_repository::ActivityLogRepository;
use crate::db::system_status_repository::{StatusUpdateOutcome, SystemStatusRepository};
use crate::db::ticket_repository::{CreateTicketOutcome, TicketCounts, TicketRepository};
use crate::db::user_repository::{CreateUserOutcome, UserRepository};
use crate::models::activity_log::{ActivityLogEntry, ActivityLogFilter, NewActivityLog};
use crate::models::system_status::{SystemStatus, SystemStatusUpdate};
use crate::models::ticket::{NewTicket, Ticket, TicketStatus, TicketSummary};
use crate::models::ticket_response::{NewTicketResponse, TicketResponse, TicketResponseView};
use crate::models::user::{NewUser, PublicUser, User, UserRole};

#[derive(Default)]
struct MockState {
    users: Vec<User>,
    tickets: Vec<Ticket>,
    responses: Vec<TicketResponse>,
    activity: Vec<ActivityLogEntry>,
    status: Option<SystemStatus>,
}

/// In-memory store enforcing the same uniqueness rules as the schema.
#[derive(Default)]
pub struct MockDb {
    state: Mutex<MockState>,
    pub should_fail: bool,
    pub fail_activity: bool,
    /// Number of upcoming ticket inserts to reject as ticket-number collisions.
    pub forced_number_collisions: Mutex<usize>,
}

fn mock_failure() -> sqlx::Error {
    sqlx::Error::Protocol("Mock DB failure".into())
}

impl MockDb {
    /// Every call fails as if the database were unreachable.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Only activity inserts fail.
    pub fn failing_activity_log() -> Self {
        Self {
            fail_activity: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(mock_failure());
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Inserts a user directly; `password` is hashed when given.
    pub fn seed_user(&self, name: &str, email: &str, password: Option<&str>, role: UserRole) -> User {
        let mut state = self.lock();
        let user = User {
            id: state.users.len() as i64 + 1,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password.map(|p| crate::utils::password::hash_password(p).unwrap()),
            role,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        state.users.push(user.clone());
        user
    }

    pub fn seed_ticket(&self, ticket: Ticket) -> Ticket {
        self.lock().tickets.push(ticket.clone());
        ticket
    }

    pub fn seed_status(&self, status: SystemStatus) {
        self.lock().status = Some(status);
    }

    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    pub fn tickets(&self) -> Vec<Ticket> {
        self.lock().tickets.clone()
    }

    pub fn ticket(&self, ticket_id: i64) -> Option<Ticket> {
        self.lock().tickets.iter().find(|t| t.id == ticket_id).cloned()
    }

    pub fn responses(&self) -> Vec<TicketResponse> {
        self.lock().responses.clone()
    }

    pub fn activity_actions(&self) -> Vec<String> {
        self.lock().activity.iter().map(|e| e.action.clone()).collect()
    }

    pub fn status(&self) -> Option<SystemStatus> {
        self.lock().status.clone()
    }
}

fn update_ticket<F>(state: &mut MockState, ticket_id: i64, apply: F) -> Option<Ticket>
where
    F: FnOnce(&mut Ticket) -> bool,
{
    let ticket = state.tickets.iter_mut().find(|t| t.id == ticket_id)?;
    if !apply(ticket) {
        return None;
    }
    ticket.updated_at = OffsetDateTime::now_utc();
    Some(ticket.clone())
}

#[async_trait]
impl UserRepository for MockDb {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self.lock().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_agent_by_id(&self, agent_id: i64) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.id == agent_id && u.role == UserRole::Agent)
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<CreateUserOutcome, sqlx::Error> {
        self.check()?;
        let mut state = self.lock();
        if state.users.iter().any(|u| u.email == user.email) {
            return Ok(CreateUserOutcome::EmailTaken);
        }
        let created = User {
            id: state.users.len() as i64 + 1,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: OffsetDateTime::now_utc(),
            last_login: None,
        };
        state.users.push(created.clone());
        Ok(CreateUserOutcome::Created(created))
    }

    async fn find_or_create_customer(&self, name: &str, email: &str) -> Result<User, sqlx::Error> {
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: None,
            role: UserRole::Customer,
        };
        match self.create_user(&new_user).await? {
            CreateUserOutcome::Created(user) => Ok(user),
            CreateUserOutcome::EmailTaken => self
                .find_user_by_email(email)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    async fn record_login(&self, user_id: i64) -> Result<(), sqlx::Error> {
        self.check()?;
        if let Some(user) = self.lock().users.iter_mut().find(|u| u.id == user_id) {
            user.last_login = Some(OffsetDateTime::now_utc());
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        self.check()?;
        Ok(self.lock().users.iter().rev().map(User::to_public).collect())
    }

    async fn list_users_by_roles(&self, roles: &[UserRole]) -> Result<Vec<PublicUser>, sqlx::Error> {
        self.check()?;
        let mut users: Vec<PublicUser> = self
            .lock()
            .users
            .iter()
            .filter(|u| roles.contains(&u.role))
            .map(User::to_public)
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, sqlx::Error> {
        self.check()?;
        Ok(self.lock().users.len() as i64)
    }
}

#[async_trait]
impl TicketRepository for MockDb {
    async fn create_ticket(&self, ticket: &NewTicket) -> Result<CreateTicketOutcome, sqlx::Error> {
        self.check()?;
        {
            let mut forced = self.forced_number_collisions.lock().unwrap();
            if *forced > 0 {
                *forced -= 1;
                return Ok(CreateTicketOutcome::DuplicateNumber);
            }
        }
        let mut state = self.lock();
        if state
            .tickets
            .iter()
            .any(|t| t.ticket_number == ticket.ticket_number)
        {
            return Ok(CreateTicketOutcome::DuplicateNumber);
        }
        let now = OffsetDateTime::now_utc();
        let created = Ticket {
            id: state.tickets.len() as i64 + 1,
            ticket_number: ticket.ticket_number.clone(),
            customer_id: ticket.customer_id,
            subject: ticket.subject.clone(),
            description: ticket.description.clone(),
            priority: ticket.priority,
            status: TicketStatus::Open,
            assigned_agent_id: None,
            attachment_path: ticket.attachment_path.clone(),
            created_at: now,
            updated_at: now,
        };
        state.tickets.push(created.clone());
        Ok(CreateTicketOutcome::Created(created))
    }

    async fn find_ticket(&self, ticket_id: i64) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        Ok(self.ticket(ticket_id))
    }

    async fn find_ticket_by_number_and_email(
        &self,
        ticket_number: &str,
        email: &str,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        Ok(state
            .tickets
            .iter()
            .find(|t| {
                state
                    .users
                    .iter()
                    .find(|u| u.id == t.customer_id)
                    .is_some_and(|owner| {
                        matches_lookup(&t.ticket_number, &owner.email, ticket_number, email)
                    })
            })
            .cloned())
    }

    async fn list_tickets(&self, scope: TicketScope) -> Result<Vec<TicketSummary>, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        let name_of = |id: i64| state.users.iter().find(|u| u.id == id);
        let mut rows: Vec<TicketSummary> = state
            .tickets
            .iter()
            .filter(|t| scope.includes(t))
            .filter_map(|t| {
                let customer = name_of(t.customer_id)?;
                Some(TicketSummary {
                    ticket: t.clone(),
                    customer_name: customer.name.clone(),
                    customer_email: customer.email.clone(),
                    assigned_agent_name: t
                        .assigned_agent_id
                        .and_then(name_of)
                        .map(|a| a.name.clone()),
                })
            })
            .collect();
        rank_by_priority(&mut rows, |row| &row.ticket);
        Ok(rows)
    }

    async fn list_tickets_for_email(&self, email: &str) -> Result<Vec<Ticket>, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        let Some(owner) = state.users.iter().find(|u| u.email == email) else {
            return Ok(Vec::new());
        };
        let mut tickets: Vec<Ticket> = state
            .tickets
            .iter()
            .filter(|t| t.customer_id == owner.id)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tickets)
    }

    async fn update_status(
        &self,
        ticket_id: i64,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        Ok(update_ticket(&mut self.lock(), ticket_id, |t| {
            t.status = status;
            true
        }))
    }

    async fn transition_status(
        &self,
        ticket_id: i64,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        Ok(update_ticket(&mut self.lock(), ticket_id, |t| {
            if t.status != from {
                return false;
            }
            t.status = to;
            true
        }))
    }

    async fn assign_agent(
        &self,
        ticket_id: i64,
        agent_id: i64,
    ) -> Result<Option<Ticket>, sqlx::Error> {
        self.check()?;
        Ok(update_ticket(&mut self.lock(), ticket_id, |t| {
            t.assigned_agent_id = Some(agent_id);
            true
        }))
    }

    async fn add_response(
        &self,
        response: &NewTicketResponse,
    ) -> Result<TicketResponse, sqlx::Error> {
        self.check()?;
        let mut state = self.lock();
        if !state.tickets.iter().any(|t| t.id == response.ticket_id) {
            return Err(sqlx::Error::RowNotFound);
        }
        let created = TicketResponse {
            id: state.responses.len() as i64 + 1,
            ticket_id: response.ticket_id,
            agent_id: response.author_id,
            response: response.response.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        state.responses.push(created.clone());
        Ok(created)
    }

    async fn list_responses(&self, ticket_id: i64) -> Result<Vec<TicketResponseView>, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        Ok(state
            .responses
            .iter()
            .filter(|r| r.ticket_id == ticket_id)
            .filter_map(|r| {
                let author = state.users.iter().find(|u| u.id == r.agent_id)?;
                Some(TicketResponseView {
                    id: r.id,
                    response: r.response.clone(),
                    created_at: r.created_at,
                    agent_name: author.name.clone(),
                    agent_role: author.role,
                })
            })
            .collect())
    }

    async fn ticket_counts(&self) -> Result<TicketCounts, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        let count = |pred: fn(&TicketStatus) -> bool| {
            state.tickets.iter().filter(|t| pred(&t.status)).count() as i64
        };
        Ok(TicketCounts {
            total: state.tickets.len() as i64,
            active: count(|s| matches!(s, TicketStatus::Open | TicketStatus::Pending)),
            resolved: count(|s| *s == TicketStatus::Resolved),
        })
    }
}

#[async_trait]
impl ActivityLogRepository for MockDb {
    async fn insert_activity(&self, entry: &NewActivityLog) -> Result<(), sqlx::Error> {
        self.check()?;
        if self.fail_activity {
            return Err(mock_failure());
        }
        let mut state = self.lock();
        let row = ActivityLogEntry {
            id: state.activity.len() as i64 + 1,
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            details: Some(entry.details.clone()),
            ip_address: Some(entry.ip_address.clone()),
            created_at: OffsetDateTime::now_utc(),
            user_name: None,
            user_email: None,
            user_role: None,
        };
        state.activity.push(row);
        Ok(())
    }

    async fn list_activity(
        &self,
        filter: &ActivityLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
        self.check()?;
        let state = self.lock();
        let mut rows: Vec<ActivityLogEntry> = state
            .activity
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| {
                let mut row = e.clone();
                if let Some(user) = e
                    .user_id
                    .and_then(|id| state.users.iter().find(|u| u.id == id))
                {
                    row.user_name = Some(user.name.clone());
                    row.user_email = Some(user.email.clone());
                    row.user_role = Some(user.role.as_str().to_string());
                }
                row
            })
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_activity(&self, filter: &ActivityLogFilter) -> Result<i64, sqlx::Error> {
        self.check()?;
        Ok(self
            .lock()
            .activity
            .iter()
            .filter(|e| filter.matches(e))
            .count() as i64)
    }
}

#[async_trait]
impl SystemStatusRepository for MockDb {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        self.check()
    }

    async fn get_status(&self) -> Result<Option<SystemStatus>, sqlx::Error> {
        self.check()?;
        Ok(self.status())
    }

    async fn update_status(
        &self,
        update: &SystemStatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error> {
        self.check()?;
        let mut state = self.lock();
        let current = state.status.clone().unwrap_or_else(SystemStatus::unseeded);
        if update.expected_version.is_some_and(|expected| expected != current.version) {
            return Ok(StatusUpdateOutcome::VersionConflict(current));
        }
        let next = SystemStatus {
            primary_system_status: update.primary_system_status.clone(),
            failover_activated: update.failover_activated,
            version: current.version + 1,
            last_updated: OffsetDateTime::now_utc(),
        };
        state.status = Some(next.clone());
        Ok(StatusUpdateOutcome::Updated(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::TicketPriority;

    fn new_ticket(number: &str, customer_id: i64) -> NewTicket {
        NewTicket {
            ticket_number: number.to_string(),
            customer_id,
            subject: "Printer broken".into(),
            description: "It jams".into(),
            priority: TicketPriority::High,
            attachment_path: None,
        }
    }

    #[tokio::test]
    async fn second_ticket_with_same_number_is_rejected() {
        let db = MockDb::default();
        let customer = db.seed_user("A", "a@x.com", None, UserRole::Customer);
        let first = db
            .create_ticket(&new_ticket("TKT-1-ABCDE", customer.id))
            .await
            .unwrap();
        assert!(matches!(first, CreateTicketOutcome::Created(_)));
        let second = db
            .create_ticket(&new_ticket("TKT-1-ABCDE", customer.id))
            .await
            .unwrap();
        assert!(matches!(second, CreateTicketOutcome::DuplicateNumber));
        assert_eq!(db.tickets().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_reported_not_inserted() {
        let db = MockDb::default();
        db.seed_user("A", "a@x.com", None, UserRole::Customer);
        let outcome = db
            .create_user(&NewUser {
                name: "Other".into(),
                email: "a@x.com".into(),
                password_hash: None,
                role: UserRole::Customer,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CreateUserOutcome::EmailTaken));
        assert_eq!(db.users().len(), 1);
    }

    #[tokio::test]
    async fn stale_version_does_not_overwrite_status() {
        let db = MockDb::default();
        let update = |active, expected| SystemStatusUpdate {
            primary_system_status: "offline".into(),
            failover_activated: active,
            expected_version: expected,
        };
        let first = SystemStatusRepository::update_status(&db, &update(true, None))
            .await
            .unwrap();
        let StatusUpdateOutcome::Updated(first) = first else {
            panic!("first write should land");
        };
        assert_eq!(first.version, 1);

        SystemStatusRepository::update_status(&db, &update(false, Some(1)))
            .await
            .unwrap();
        let stale = SystemStatusRepository::update_status(&db, &update(true, Some(1)))
            .await
            .unwrap();
        assert!(matches!(stale, StatusUpdateOutcome::VersionConflict(ref s) if s.version == 2));
        assert!(!db.status().unwrap().failover_activated);
    }
}
