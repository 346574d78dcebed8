//! Outgoing account email (password reset and verification links).

use std::sync::Arc;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{EmailConfig, SmtpConfig};
use crate::integrations::Mailer;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Email build error: {0}")]
    Build(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Pick the SMTP mailer when SMTP is configured, else the log-only one.
pub fn from_config(config: &EmailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp, &config.from_address)?)),
        None => {
            tracing::warn!("SMTP not configured; account emails will be written to the log");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: lettre::message::Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from_address: &str) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from: lettre::message::Mailbox = from_address.parse()?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Account email sent");
        Ok(())
    }
}

/// Development mailer: the message, link included, goes to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email not sent (SMTP disabled):\n{}",
            email.body
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_accepts_everything() {
        let mailer = from_config(&EmailConfig::default()).unwrap();
        mailer
            .send(OutgoingEmail {
                to: "client@example.com".to_string(),
                subject: "Verify your email".to_string(),
                body: "http://localhost/auth/action?mode=verifyEmail&oobCode=abc".to_string(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn build_error_display() {
        let err = MailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
