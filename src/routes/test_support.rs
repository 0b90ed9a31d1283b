use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;

use crate::db::mock_db::MockDb;
use crate::models::ticket::{Ticket, TicketPriority, TicketStatus};
use crate::models::user::User;
use crate::routes::app_router;
use crate::services::attachments::AttachmentStore;
use crate::services::smtp_mailer::MockMailer;
use crate::state::{AppState, Repositories};
use crate::utils::jwt::{issue_token, JwtKeys};

pub const TEST_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const MAX_ATTACHMENT: usize = 1024;

pub struct TestApp {
    pub db: Arc<MockDb>,
    pub mailer: Arc<MockMailer>,
    pub state: AppState,
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(MockDb::default(), MockMailer::default())
    }

    pub fn with(db: MockDb, mailer: MockMailer) -> Self {
        let db = Arc::new(db);
        let mailer = Arc::new(mailer);
        let uploads = tempfile::tempdir().unwrap();
        let repos = Repositories {
            users: db.clone(),
            tickets: db.clone(),
            activity_logs: db.clone(),
            system_status: db.clone(),
        };
        let state = AppState::new(
            repos,
            mailer.clone(),
            AttachmentStore::new(uploads.path().join("uploads")),
            JwtKeys::from_secret(TEST_SECRET).unwrap(),
            "support-portal",
            "support-portal-web",
            MAX_ATTACHMENT,
        );
        Self {
            db,
            mailer,
            state,
            uploads,
        }
    }

    pub fn router(&self) -> Router {
        app_router(self.state.clone())
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_token(user, &self.state).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn ticket(id: i64, customer_id: i64, assigned: Option<i64>, status: TicketStatus) -> Ticket {
    let now = OffsetDateTime::now_utc();
    Ticket {
        id,
        ticket_number: format!("TKT-1700000000000-{id:05}"),
        customer_id,
        subject: "Printer broken".into(),
        description: "It jams on every page".into(),
        priority: TicketPriority::Medium,
        status,
        assigned_agent_id: assigned,
        attachment_path: None,
        created_at: now,
        updated_at: now,
    }
}
