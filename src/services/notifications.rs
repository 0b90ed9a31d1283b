//! Best-effort outbound email.
//!
//! Every send goes through [`Notifier::deliver`], which swallows mail errors
//! after logging them. Callers get a [`NotificationReport`] and decide whether
//! to surface a warning; nothing here can fail the request that triggered it.

use std::sync::Arc;

use tracing::warn;

use crate::models::ticket::Ticket;
use crate::models::user::PublicUser;
use crate::services::smtp_mailer::Mailer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub attempted: usize,
    pub failed: usize,
}

impl NotificationReport {
    pub fn merge(self, other: NotificationReport) -> NotificationReport {
        NotificationReport {
            attempted: self.attempted + other.attempted,
            failed: self.failed + other.failed,
        }
    }

    /// Text for the `warning` field of a response, when anything failed.
    pub fn warning(&self) -> Option<String> {
        (self.failed > 0).then(|| {
            format!(
                "{} of {} notification emails could not be sent",
                self.failed, self.attempted
            )
        })
    }
}

#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    async fn deliver(&self, recipients: &[&str], subject: &str, body: &str) -> NotificationReport {
        let mut report = NotificationReport::default();
        for &to in recipients {
            report.attempted += 1;
            if let Err(err) = self.mailer.send_email(to, subject, body).await {
                report.failed += 1;
                warn!(%to, %subject, error = %err, "failed to send notification email");
            }
        }
        report
    }

    /// Confirmation to the submitter plus a heads-up to every staff member.
    pub async fn ticket_created(
        &self,
        ticket: &Ticket,
        customer_name: &str,
        customer_email: &str,
        staff: &[PublicUser],
    ) -> NotificationReport {
        let confirmation = format!(
            "Dear {customer_name},\n\n\
             We received your support request.\n\n\
             Ticket Number: {}\n\
             Subject: {}\n\
             Priority: {}\n\n\
             Keep the ticket number: together with your email it lets you check the status of your ticket at any time.\n",
            ticket.ticket_number,
            ticket.subject,
            ticket.priority.label(),
        );
        let customer = self
            .deliver(
                &[customer_email],
                &format!("Ticket Confirmation - {}", ticket.ticket_number),
                &confirmation,
            )
            .await;

        let notice = format!(
            "A new support ticket was submitted.\n\n\
             Ticket Number: {}\n\
             Customer: {customer_name} <{customer_email}>\n\
             Subject: {}\n\
             Priority: {}\n\n\
             {}\n",
            ticket.ticket_number,
            ticket.subject,
            ticket.priority.label(),
            ticket.description,
        );
        let staff_emails: Vec<&str> = staff.iter().map(|u| u.email.as_str()).collect();
        let staff_report = self
            .deliver(
                &staff_emails,
                &format!("New Support Ticket - {}", ticket.ticket_number),
                &notice,
            )
            .await;

        customer.merge(staff_report)
    }

    pub async fn ticket_updated(
        &self,
        ticket: &Ticket,
        customer_name: &str,
        customer_email: &str,
        agent_response: Option<&str>,
    ) -> NotificationReport {
        let status = ticket.status.label();
        let mut body = format!(
            "Dear {customer_name},\n\n\
             Your support ticket has been updated.\n\n\
             Ticket Number: {}\n\
             New Status: {status}\n",
            ticket.ticket_number,
        );
        if let Some(response) = agent_response {
            body.push_str(&format!("\nAgent Response:\n{response}\n"));
        }
        self.deliver(
            &[customer_email],
            &format!("Ticket Update - {} - Status: {status}", ticket.ticket_number),
            &body,
        )
        .await
    }

    pub async fn customer_responded(
        &self,
        ticket: &Ticket,
        agent_email: &str,
        customer_name: &str,
        response: &str,
    ) -> NotificationReport {
        let body = format!(
            "{customer_name} replied to ticket {}.\n\n\
             Subject: {}\n\
             Status: {}\n\n\
             {response}\n",
            ticket.ticket_number,
            ticket.subject,
            ticket.status.label(),
        );
        self.deliver(
            &[agent_email],
            &format!("Customer Response - {}", ticket.ticket_number),
            &body,
        )
        .await
    }

    pub async fn ticket_assigned(&self, ticket: &Ticket, agent: &PublicUser) -> NotificationReport {
        let body = format!(
            "Hi {},\n\n\
             Ticket {} has been assigned to you.\n\n\
             Subject: {}\n\
             Priority: {}\n\
             Status: {}\n",
            agent.name,
            ticket.ticket_number,
            ticket.subject,
            ticket.priority.label(),
            ticket.status.label(),
        );
        self.deliver(
            &[agent.email.as_str()],
            &format!("Ticket Assigned - {}", ticket.ticket_number),
            &body,
        )
        .await
    }

    /// One email per admin.
    pub async fn failover_changed(&self, active: bool, admins: &[PublicUser]) -> NotificationReport {
        let (subject, body) = if active {
            (
                "FAILOVER ACTIVATED - Primary Support System is Down",
                "The backup support portal is now active and the primary support system is OFFLINE.\n\n\
                 Action required:\n\
                 - Monitor incoming tickets closely\n\
                 - Ensure all agents are available\n\
                 - Prepare for increased ticket volume\n",
            )
        } else {
            (
                "FAILOVER DEACTIVATED - Primary Support System is Back Online",
                "The primary support system is ONLINE again and the backup portal can be deactivated.\n\n\
                 Monitor for any remaining issues.\n",
            )
        };
        let admin_emails: Vec<&str> = admins.iter().map(|u| u.email.as_str()).collect();
        self.deliver(&admin_emails, subject, body).await
    }
}
