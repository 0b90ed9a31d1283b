use async_trait::async_trait;
use lettre::address::AddressError;
use std::fmt;

#[derive(Debug)]
pub enum MailError {
    Other(String),
    InvalidEmailAddress(String),
    SendError(String),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Other(e) => write!(f, "Error: {}", e),
            MailError::InvalidEmailAddress(e) => write!(f, "Invalid Address: {}", e),
            MailError::SendError(e) => write!(f, "Send error: {}", e),
        }
    }
}

impl std::error::Error for MailError {}

use lettre::transport::smtp::Error as SmtpError;

impl From<SmtpError> for MailError {
    fn from(err: SmtpError) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    StartTls,
    Implicit,
    None,
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TlsMode::StartTls => "starttls",
            TlsMode::Implicit => "implicit",
            TlsMode::None => "none",
        };
        f.write_str(label)
    }
}

impl TlsMode {
    /// Port 465 speaks TLS from the first byte; everything else upgrades.
    pub fn for_port(port: u16, tls_disabled: bool) -> Self {
        match (tls_disabled, port) {
            (true, _) => TlsMode::None,
            (false, 465) => TlsMode::Implicit,
            (false, _) => TlsMode::StartTls,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls_mode: TlsMode,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Used when SMTP is not configured: every message is logged and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(%to, %subject, "email not configured; skipping send");
        Ok(())
    }
}

#[cfg(test)]
mod mock_mailer;
mod smtp_impl;

#[cfg(test)]
pub use mock_mailer::{MockMailer, RecordedEmail};
pub use smtp_impl::SmtpMailer;
