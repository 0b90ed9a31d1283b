use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context};

use crate::services::smtp_mailer::{SmtpConfig, TlsMode};

pub const DEFAULT_JWT_ISSUER: &str = "support-portal";
pub const DEFAULT_JWT_AUDIENCE: &str = "support-portal-web";
pub const DEFAULT_MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub per_millisecond: u64,
    pub burst: u32,
    pub auth_per_second: u64,
    pub auth_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_millisecond: 200,
            burst: 20,
            auth_per_second: 1,
            auth_burst: 10,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub frontend_origin: String,
    pub bind_addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub max_attachment_bytes: usize,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub rate_limit: RateLimitConfig,
    pub smtp: Option<SmtpConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("frontend_origin", &self.frontend_origin)
            .field("bind_addr", &self.bind_addr)
            .field("upload_dir", &self.upload_dir)
            .field("max_attachment_bytes", &self.max_attachment_bytes)
            .field("db_max_connections", &self.db_max_connections)
            .field("run_migrations", &self.run_migrations)
            .field("smtp_enabled", &self.smtp.is_some())
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok(); // Load .env file
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| var(key).ok_or_else(|| anyhow!("{key} must be set"));

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| "127.0.0.1:4000".to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address such as 127.0.0.1:4000")?;

        let max_attachment_bytes = parse_or(&var, "MAX_ATTACHMENT_BYTES", DEFAULT_MAX_ATTACHMENT_BYTES)?;
        let db_max_connections = parse_or(&var, "DB_MAX_CONNECTIONS", 10u32)?;
        let run_migrations = var("RUN_MIGRATIONS").is_some_and(|v| is_truthy(&v));

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            per_millisecond: parse_or(&var, "RATE_LIMITER_MILLISECONDS", defaults.per_millisecond)?,
            burst: parse_or(&var, "RATE_LIMITER_BURST", defaults.burst)?,
            auth_per_second: parse_or(&var, "RATE_LIMITER_AUTH_SECONDS", defaults.auth_per_second)?,
            auth_burst: parse_or(&var, "RATE_LIMITER_AUTH_BURST", defaults.auth_burst)?,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            jwt_audience: var("JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.to_string()),
            frontend_origin: var("FRONTEND_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            bind_addr,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string())),
            max_attachment_bytes,
            db_max_connections,
            run_migrations,
            rate_limit,
            smtp: smtp_from_lookup(&var)?,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// SMTP is optional; it is enabled by setting `SMTP_HOST`.
fn smtp_from_lookup<F>(var: &F) -> anyhow::Result<Option<SmtpConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(host) = var("SMTP_HOST") else {
        return Ok(None);
    };
    let port = parse_or(var, "SMTP_PORT", 587u16)?;
    let username = var("SMTP_USERNAME");
    let password = var("SMTP_PASSWORD");
    let from = match (var("SMTP_FROM"), username.as_deref()) {
        (Some(from), _) => from,
        (None, Some(user)) => format!("Backup Support Portal <{user}>"),
        (None, None) => return Err(anyhow!("SMTP_FROM must be set when SMTP_USERNAME is not")),
    };
    let tls_disabled = var("SMTP_TLS_DISABLED").is_some_and(|v| is_truthy(&v));

    Ok(Some(SmtpConfig {
        host,
        port,
        username,
        password,
        from,
        tls_mode: TlsMode::for_port(port, tls_disabled),
    }))
}
