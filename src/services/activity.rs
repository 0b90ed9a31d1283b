use std::sync::Arc;

use tracing::{info, warn};

use crate::db::activity_log_repository::ActivityLogRepository;
use crate::models::activity_log::{ActivityAction, NewActivityLog};
use crate::utils::ip::ClientIp;

/// Append-only audit trail. A failed write is logged and otherwise ignored.
#[derive(Clone)]
pub struct ActivityLogger {
    repo: Arc<dyn ActivityLogRepository>,
}

impl ActivityLogger {
    pub fn new(repo: Arc<dyn ActivityLogRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(
        &self,
        user_id: Option<i64>,
        action: ActivityAction,
        details: impl Into<String>,
        ip: &ClientIp,
    ) {
        let entry = NewActivityLog {
            user_id,
            action,
            details: details.into(),
            ip_address: ip.as_log_value(),
        };
        match self.repo.insert_activity(&entry).await {
            Ok(()) => info!(user_id = ?user_id, action = action.as_str(), "activity recorded"),
            Err(err) => warn!(
                user_id = ?user_id,
                action = action.as_str(),
                error = %err,
                "failed to record activity"
            ),
        }
    }
}
