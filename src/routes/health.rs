use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use sysinfo::{Pid, System};
use time::OffsetDateTime;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: u64,
    pub memory_bytes: Option<u64>,
    pub version: &'static str,
}

/// Resident memory of this process, when the platform reports it.
fn process_memory() -> Option<u64> {
    let pid = Pid::from_u32(std::process::id());
    let mut sys = System::new();
    sys.refresh_process(pid);
    sys.process(pid).map(|process| process.memory())
}

pub async fn health(State(app_state): State<AppState>) -> Response {
    let database_ok = match app_state.system_status.ping().await {
        Ok(()) => true,
        Err(e) => {
            error!(error = %e, "health check could not reach the database");
            false
        }
    };

    let report = HealthReport {
        status: if database_ok { "healthy" } else { "unhealthy" },
        database: if database_ok { "healthy" } else { "unhealthy" },
        timestamp: OffsetDateTime::now_utc(),
        uptime_seconds: app_state.started_at.elapsed().as_secs(),
        memory_bytes: process_memory(),
        version: env!("CARGO_PKG_VERSION"),
    };
    let code = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report)).into_response()
}
