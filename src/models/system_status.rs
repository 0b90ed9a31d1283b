use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

pub const DEFAULT_PRIMARY_STATUS: &str = "online";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    #[serde(rename = "primarySystem")]
    pub primary_system_status: String,
    pub failover_activated: bool,
    /// Bumped on every write; clients echo it back for compare-and-swap.
    pub version: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl SystemStatus {
    /// Reported when the status row has not been seeded yet.
    pub fn unseeded() -> Self {
        Self {
            primary_system_status: DEFAULT_PRIMARY_STATUS.to_string(),
            failover_activated: false,
            version: 0,
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatusUpdate {
    pub primary_system_status: String,
    pub failover_activated: bool,
    pub expected_version: Option<i64>,
}
