use async_trait::async_trait;

use crate::models::system_status::{SystemStatus, SystemStatusUpdate};

#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdateOutcome {
    Updated(SystemStatus),
    /// `expected_version` was stale; carries the row as it is now.
    VersionConflict(SystemStatus),
}

#[async_trait]
pub trait SystemStatusRepository: Send + Sync {
    async fn ping(&self) -> Result<(), sqlx::Error>;
    async fn get_status(&self) -> Result<Option<SystemStatus>, sqlx::Error>;
    /// Writes the singleton row, creating it if needed. With an expected
    /// version the write only lands if the stored version still matches.
    async fn update_status(
        &self,
        update: &SystemStatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error>;
}
