//! Outgoing mail: welcome and password-reset messages.

use std::sync::Mutex;

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::SmtpSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp delivery failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// STARTTLS SMTP relay.
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    pub fn new(host: &str, settings: &SmtpSettings) -> Result<Self, EmailError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| EmailError::Address(format!("{}: {e}", settings.from)))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| EmailError::Transport(e.to_string()))?
            .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| EmailError::Address(format!("{}: {e}", message.to)))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.as_str())
            .multipart(MultiPart::alternative_plain_html(
                message.text_body,
                message.html_body,
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(email)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        debug!(to = %message.to, code = %response.code(), "email delivered");
        Ok(())
    }
}

/// Logs messages instead of sending them. Used when no SMTP host is set.
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.text_body,
            "smtp not configured; email not sent"
        );
        Ok(())
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct OutboxEmailSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl OutboxEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EmailSender for OutboxEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

pub fn welcome_email(to: &str, username: &str, set_password_link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Welcome to Config Server".to_string(),
        text_body: format!(
            "Hello {username},\n\n\
             An account has been created for you. Set your password here:\n\
             {set_password_link}\n\n\
             The link expires after first use or after a limited time."
        ),
        html_body: format!(
            "<p>Hello {username},</p>\
             <p>An account has been created for you. \
             <a href=\"{set_password_link}\">Set your password</a>.</p>\
             <p>The link expires after first use or after a limited time.</p>"
        ),
    }
}

pub fn password_reset_email(to: &str, username: &str, reset_link: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Config Server password reset".to_string(),
        text_body: format!(
            "Hello {username},\n\n\
             A password reset was requested for your account. Reset it here:\n\
             {reset_link}\n\n\
             If you did not request this, ignore this email."
        ),
        html_body: format!(
            "<p>Hello {username},</p>\
             <p>A password reset was requested for your account. \
             <a href=\"{reset_link}\">Reset your password</a>.</p>\
             <p>If you did not request this, ignore this email.</p>"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_carry_the_link() {
        let link = "http://localhost:3000/reset-password?token=abc";
        let welcome = welcome_email("a@example.com", "alice", link);
        assert_eq!(welcome.to, "a@example.com");
        assert!(welcome.text_body.contains(link));
        assert!(welcome.html_body.contains(link));

        let reset = password_reset_email("a@example.com", "alice", link);
        assert!(reset.text_body.contains(link));
        assert_ne!(reset.subject, welcome.subject);
    }

    #[tokio::test]
    async fn outbox_records_messages() {
        let outbox = OutboxEmailSender::new();
        outbox
            .send(welcome_email("a@example.com", "alice", "link"))
            .await
            .unwrap();
        assert_eq!(outbox.messages().len(), 1);
    }

    #[test]
    fn smtp_sender_rejects_bad_from_address() {
        let settings = SmtpSettings {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            username: None,
            password: None,
            from: "not an address".to_string(),
        };
        assert!(matches!(
            SmtpEmailSender::new("smtp.example.com", &settings),
            Err(EmailError::Address(_))
        ));
    }
}
