//! SMTP mail session built on lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailMessage, Mailer, NotifyError};
use crate::config::SmtpConfig;

const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Authenticated SMTP session, optionally upgraded with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport and log in once, before any probe runs.
    pub async fn connect(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
                .map_err(|e| NotifyError::Smtp(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.smtp_user.clone(),
                config.smtp_password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        tracing::info!(
            "Connecting to SMTP server {}:{} (starttls={})",
            config.smtp_host,
            config.smtp_port,
            config.starttls
        );

        // The pooled connection opened here is handed back and reused by send
        let ready = transport
            .test_connection()
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        if !ready {
            return Err(NotifyError::Smtp(format!(
                "server {} did not accept the session",
                config.smtp_host
            )));
        }

        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_message(&self, message: &MailMessage) -> Result<(), NotifyError> {
        let email = build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Smtp(e.to_string()))?;
        tracing::debug!("SMTP message delivered to {}", message.to);
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Build a plain-text RFC 5322 message.
pub fn build_message(message: &MailMessage) -> Result<Message, NotifyError> {
    Message::builder()
        .from(parse_mailbox(&message.from)?)
        .to(parse_mailbox(&message.to)?)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(message.body.clone())
        .map_err(|e| NotifyError::Message(e.to_string()))
}
