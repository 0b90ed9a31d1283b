use async_trait::async_trait;

use crate::models::activity_log::{ActivityLogEntry, ActivityLogFilter, NewActivityLog};

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn insert_activity(&self, entry: &NewActivityLog) -> Result<(), sqlx::Error>;
    /// Newest first.
    async fn list_activity(
        &self,
        filter: &ActivityLogFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ActivityLogEntry>, sqlx::Error>;
    async fn count_activity(&self, filter: &ActivityLogFilter) -> Result<i64, sqlx::Error>;
}
