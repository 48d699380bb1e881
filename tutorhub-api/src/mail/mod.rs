//! Outbound email: queue, delivery backends and templates

pub mod queue;
pub mod sender;
pub mod templates;

pub use queue::{spawn_worker, MailQueue, MailReceiver};
pub use sender::{EmailSender, LogEmailSender, MailError, SmtpEmailSender};

use std::sync::Arc;
use tracing::{info, warn};
use tutorhub_common::config::SmtpConfig;

/// One rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// SMTP sender when enabled and valid, log-only otherwise
pub fn sender_from_config(config: &SmtpConfig) -> Arc<dyn EmailSender> {
    if !config.enabled {
        info!("SMTP disabled, emails will be logged only");
        return Arc::new(LogEmailSender);
    }

    match SmtpEmailSender::new(config) {
        Ok(sender) => {
            info!("Sending email through {}:{}", config.host, config.port);
            Arc::new(sender)
        }
        Err(e) => {
            warn!("SMTP configuration invalid ({}), emails will be logged only", e);
            Arc::new(LogEmailSender)
        }
    }
}
