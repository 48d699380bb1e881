//! Named in-process email queue
//!
//! Handlers enqueue without waiting; a single worker drains the queue into an
//! [`EmailSender`]. Delivery failures are logged and dropped.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{EmailMessage, EmailSender};

/// Producer side of the queue
#[derive(Clone, Debug)]
pub struct MailQueue {
    name: Arc<str>,
    tx: mpsc::Sender<EmailMessage>,
}

/// Consumer side, handed to [`spawn_worker`]
pub struct MailReceiver {
    name: Arc<str>,
    rx: mpsc::Receiver<EmailMessage>,
}

impl MailQueue {
    pub fn new(name: &str, capacity: usize) -> (Self, MailReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let name: Arc<str> = Arc::from(name);
        (
            Self {
                name: name.clone(),
                tx,
            },
            MailReceiver { name, rx },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a message; returns false when it had to be dropped
    pub fn enqueue(&self, message: EmailMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(
                    "Mail queue '{}' is full, dropping email to {}",
                    self.name, message.to
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(message)) => {
                warn!(
                    "Mail queue '{}' is closed, dropping email to {}",
                    self.name, message.to
                );
                false
            }
        }
    }
}

/// Drain the queue until every producer is gone
pub fn spawn_worker(receiver: MailReceiver, sender: Arc<dyn EmailSender>) -> JoinHandle<()> {
    let MailReceiver { name, mut rx } = receiver;
    info!("Mail worker consuming queue '{}'", name);

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match sender.send(&message).await {
                Ok(()) => debug!("Sent '{}' to {}", message.subject, message.to),
                Err(e) => error!("Failed to send '{}' to {}: {}", message.subject, message.to, e),
            }
        }
        info!("Mail queue '{}' closed, worker exiting", name);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::MailError;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailSender for Recording {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if message.to.starts_with("fail") {
                return Err(MailError::Transport("refused".to_string()));
            }
            self.sent.lock().await.push(message.to.clone());
            Ok(())
        }
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "s".to_string(),
            html_body: "b".to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_delivers_and_survives_failures() {
        let (queue, receiver) = MailQueue::new("test-mail", 8);
        let sender = Arc::new(Recording::default());
        let worker = spawn_worker(receiver, sender.clone());

        assert!(queue.enqueue(message("a@example.com")));
        assert!(queue.enqueue(message("fail@example.com")));
        assert!(queue.enqueue(message("b@example.com")));
        drop(queue);
        worker.await.unwrap();

        assert_eq!(
            *sender.sent.lock().await,
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (queue, _receiver) = MailQueue::new("tiny", 1);
        assert_eq!(queue.name(), "tiny");
        assert!(queue.enqueue(message("a@example.com")));
        assert!(!queue.enqueue(message("b@example.com")));
    }
}
