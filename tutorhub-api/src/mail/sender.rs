//! Email delivery backends

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;
use tutorhub_common::config::SmtpConfig;

use super::EmailMessage;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address {0}: {1}")]
    Address(String, String),

    #[error("Could not build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),
}

/// Something that can deliver an [`EmailMessage`]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

/// Delivers through an SMTP relay
pub struct SmtpEmailSender {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    /// Port 465 uses implicit TLS, anything else STARTTLS
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
        }
        .map_err(|e| MailError::Transport(format!("Invalid SMTP host {}: {}", config.host, e)))?;

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        let from = config
            .from
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(config.from.clone(), e.to_string()))?;

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }

    fn build(&self, message: &EmailMessage) -> Result<Message, MailError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::Address(message.to.clone(), e.to_string()))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        let email = self.build(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Logs messages instead of sending them; used when SMTP is disabled
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        info!(
            "Email (SMTP disabled) to {}: {} ({} bytes)",
            message.to,
            message.subject,
            message.html_body.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_accepts_anything() {
        let sender = LogEmailSender;
        let message = EmailMessage {
            to: "parent@example.com".to_string(),
            subject: "Hello".to_string(),
            html_body: "<p>Hi</p>".to_string(),
        };
        assert!(sender.send(&message).await.is_ok());
    }

    #[test]
    fn test_smtp_sender_rejects_bad_from_address() {
        let config = SmtpConfig {
            enabled: true,
            from: "not an address".to_string(),
            ..Default::default()
        };
        assert!(matches!(SmtpEmailSender::new(&config), Err(MailError::Address(..))));
    }

    #[test]
    fn test_smtp_message_builds() {
        let sender = SmtpEmailSender::new(&SmtpConfig::default()).unwrap();
        let message = EmailMessage {
            to: "Tutor <tutor@example.com>".to_string(),
            subject: "Welcome".to_string(),
            html_body: "<p>Welcome</p>".to_string(),
        };
        assert!(sender.build(&message).is_ok());

        let invalid = EmailMessage {
            to: "nobody".to_string(),
            ..message
        };
        assert!(matches!(sender.build(&invalid), Err(MailError::Address(..))));
    }
}
