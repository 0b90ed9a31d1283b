use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::system_status_repository::{StatusUpdateOutcome, SystemStatusRepository};
use crate::models::system_status::{SystemStatus, SystemStatusUpdate};

const STATUS_COLUMNS: &str = "primary_system_status, failover_activated, version, last_updated";

pub struct PostgresSystemStatusRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SystemStatusRepository for PostgresSystemStatusRepository {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_status(&self) -> Result<Option<SystemStatus>, sqlx::Error> {
        sqlx::query_as::<_, SystemStatus>(&format!(
            "SELECT {STATUS_COLUMNS} FROM system_status WHERE id = 1"
        ))
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_status(
        &self,
        update: &SystemStatusUpdate,
    ) -> Result<StatusUpdateOutcome, sqlx::Error> {
        // Seeds the row on first write; a missing row counts as version 0.
        // A NULL expected version skips the compare.
        let updated = sqlx::query_as::<_, SystemStatus>(&format!(
            r#"
            INSERT INTO system_status (id, primary_system_status, failover_activated, version, last_updated)
            SELECT 1, $1, $2, 1, NOW()
            WHERE $3::BIGINT IS NULL
               OR $3 = 0
               OR EXISTS (SELECT 1 FROM system_status WHERE id = 1)
            ON CONFLICT (id) DO UPDATE
            SET primary_system_status = EXCLUDED.primary_system_status,
                failover_activated = EXCLUDED.failover_activated,
                version = system_status.version + 1,
                last_updated = NOW()
            WHERE $3::BIGINT IS NULL OR system_status.version = $3
            RETURNING {STATUS_COLUMNS}
            "#
        ))
        .bind(&update.primary_system_status)
        .bind(update.failover_activated)
        .bind(update.expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(status) = updated {
            return Ok(StatusUpdateOutcome::Updated(status));
        }

        let current = self
            .get_status()
            .await?
            .unwrap_or_else(SystemStatus::unseeded);
        Ok(StatusUpdateOutcome::VersionConflict(current))
    }
}
