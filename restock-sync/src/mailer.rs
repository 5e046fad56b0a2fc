//! Outgoing mail.
//!
//! [`SmtpMailer`] relays through the configured SMTP server; [`Outbox`] keeps
//! messages in memory for tests and for runs without SMTP.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use restock_core::config::SmtpConfig;
use restock_renderer::RenderedMail;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Raised by [`Outbox`] when told to fail.
    #[error("mail rejected: {0}")]
    Rejected(String),
}

/// Something that delivers a plain-text mail to one recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, mail: &RenderedMail) -> Result<(), MailError>;
}

fn mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// STARTTLS relay on `smtp.host:smtp.port`. Credentials are only sent
    /// when a password is configured.
    pub fn from_config(smtp: &SmtpConfig, from: &str) -> Result<Self, MailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
            .port(smtp.port);
        if let Some(password) = &smtp.password {
            builder = builder.credentials(Credentials::new(smtp.username.clone(), password.clone()));
        }
        Ok(SmtpMailer {
            transport: builder.build(),
            from: mailbox(from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, mail: &RenderedMail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox(to)?)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;
        self.transport.send(message).await?;
        info!(to, subject = %mail.subject, "mail sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory [`Mailer`]. Records every accepted message.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Reject every following send.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for Outbox {
    async fn send(&self, to: &str, mail: &RenderedMail) -> Result<(), MailError> {
        mailbox(to)?;
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Rejected(format!("outbox refused mail to {to}")));
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMail {
                to: to.to_string(),
                subject: mail.subject.clone(),
                body: mail.body.clone(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> RenderedMail {
        RenderedMail {
            subject: "subject".into(),
            body: "body".into(),
        }
    }

    #[tokio::test]
    async fn outbox_records_and_can_fail() {
        let outbox = Outbox::new();
        outbox.send("staff@example.com", &mail()).await.unwrap();
        outbox.fail(true);
        assert!(matches!(
            outbox.send("staff@example.com", &mail()).await,
            Err(MailError::Rejected(_))
        ));
        assert_eq!(outbox.sent().len(), 1);
        assert_eq!(outbox.sent()[0].to, "staff@example.com");
    }

    #[tokio::test]
    async fn bad_address_is_rejected_before_sending() {
        let outbox = Outbox::new();
        let err = outbox.send("not an address", &mail()).await.unwrap_err();
        assert!(matches!(err, MailError::InvalidAddress { .. }));
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn smtp_mailer_builds_without_connecting() {
        let smtp = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 587,
            username: "bot".into(),
            password: Some("secret".into()),
        };
        assert!(SmtpMailer::from_config(&smtp, "restock@example.com").is_ok());
        assert!(matches!(
            SmtpMailer::from_config(&smtp, "nope"),
            Err(MailError::InvalidAddress { .. })
        ));
    }
}
