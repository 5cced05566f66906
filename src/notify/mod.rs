//! Notifier for alerts and digests.
//!
//! Messages go out through a [`Mailer`], which owns the mail session.

mod smtp;

pub use smtp::*;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Notification error types.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("invalid address {address}: {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("SMTP error: {0}")]
    Smtp(String),
}

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: String,
}

/// An established mail session.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_message(&self, message: &MailMessage) -> Result<(), NotifyError>;
}

/// Sends messages through the injected mail session.
///
/// Delivery failures are returned to the caller untouched; there is no retry.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub async fn notify(
        &self,
        subject: &str,
        body: &str,
        from: &str,
        to: &str,
    ) -> Result<(), NotifyError> {
        let message = MailMessage {
            subject: subject.to_string(),
            body: body.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        };

        tracing::info!("Sending notification to {}: {}", to, subject);
        self.mailer.send_message(&message).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Mailer double that keeps every message it is asked to send.
    #[derive(Default)]
    pub struct RecordingMailer {
        sent: Mutex<Vec<MailMessage>>,
        fail: bool,
    }

    impl RecordingMailer {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<MailMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_message(&self, message: &MailMessage) -> Result<(), NotifyError> {
            if self.fail {
                return Err(NotifyError::Smtp("connection reset".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
