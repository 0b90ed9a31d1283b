use crate::services::smtp_mailer::{MailError, Mailer};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Records every send attempt, including the ones it fails.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub attempts: Mutex<Vec<RecordedEmail>>,
    pub fail_send: bool,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<RecordedEmail> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<RecordedEmail> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.attempts.lock().unwrap().push(RecordedEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.fail_send {
            Err(MailError::Other("mock fail".into()))
        } else {
            Ok(())
        }
    }
}
