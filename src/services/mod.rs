pub mod activity;
pub mod attachments;
pub mod notifications;
pub mod smtp_mailer;
