use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::services::smtp_mailer::{Mailer, SmtpConfig, TlsMode};

use super::MailError;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
    config: SmtpConfig,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, MailError> {
        let sender: Mailbox = config.from.parse()?;
        let transport = build_transport(config)?;
        Ok(Self {
            transport: Arc::new(transport),
            sender,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let recipient: Mailbox = to.parse()?;
        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())?;

        self.transport.send(email).await.map(|_| ()).map_err(|e| {
            MailError::SendError(format!(
                "{} (host: {}:{}, tls: {}, auth: {})",
                e,
                self.config.host,
                self.config.port,
                self.config.tls_mode,
                if self.config.username.is_some() {
                    "set"
                } else {
                    "not set"
                }
            ))
        })
    }
}

fn build_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let mut builder = match config.tls_mode {
        TlsMode::StartTls => {
            let tls = TlsParameters::new(config.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                .port(config.port)
                .tls(Tls::Required(tls))
        }
        TlsMode::Implicit => {
            let tls = TlsParameters::new(config.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
                .port(config.port)
                .tls(Tls::Wrapper(tls))
        }
        TlsMode::None => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        }
    };

    if let (Some(username), Some(password)) = (config.username.as_ref(), config.password.as_ref()) {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}
