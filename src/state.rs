use std::sync::Arc;
use std::time::Instant;

use crate::db::{
    activity_log_repository::ActivityLogRepository,
    system_status_repository::SystemStatusRepository, ticket_repository::TicketRepository,
    user_repository::UserRepository,
};
use crate::services::activity::ActivityLogger;
use crate::services::attachments::AttachmentStore;
use crate::services::notifications::Notifier;
use crate::services::smtp_mailer::Mailer;
use crate::utils::jwt::{JwtKeyProvider, JwtKeys};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub activity_logs: Arc<dyn ActivityLogRepository>,
    pub system_status: Arc<dyn SystemStatusRepository>,
    pub activity: ActivityLogger,
    pub notifier: Notifier,
    pub attachments: AttachmentStore,
    pub jwt_keys: Arc<JwtKeys>,
    pub jwt_issuer: Arc<str>,
    pub jwt_audience: Arc<str>,
    pub max_attachment_bytes: usize,
    pub started_at: Instant,
}

/// Storage handles the router needs; production wires Postgres, tests an in-memory store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub activity_logs: Arc<dyn ActivityLogRepository>,
    pub system_status: Arc<dyn SystemStatusRepository>,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        attachments: AttachmentStore,
        jwt_keys: JwtKeys,
        jwt_issuer: &str,
        jwt_audience: &str,
        max_attachment_bytes: usize,
    ) -> Self {
        Self {
            activity: ActivityLogger::new(repos.activity_logs.clone()),
            notifier: Notifier::new(mailer),
            users: repos.users,
            tickets: repos.tickets,
            activity_logs: repos.activity_logs,
            system_status: repos.system_status,
            attachments,
            jwt_keys: Arc::new(jwt_keys),
            jwt_issuer: Arc::from(jwt_issuer),
            jwt_audience: Arc::from(jwt_audience),
            max_attachment_bytes,
            started_at: Instant::now(),
        }
    }
}

impl JwtKeyProvider for AppState {
    fn jwt_keys(&self) -> &JwtKeys {
        &self.jwt_keys
    }

    fn jwt_issuer(&self) -> &str {
        &self.jwt_issuer
    }

    fn jwt_audience(&self) -> &str {
        &self.jwt_audience
    }
}
