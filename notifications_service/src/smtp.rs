// notifications_service/src/smtp.rs

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use models::errors::{MedipalError, MedipalResult};
use tracing::{debug, info};

use crate::{Email, Mailer};

/// Connection settings for the SMTP relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address. Falls back to the username when absent.
    pub from: Option<String>,
}

/// Sends mail through a STARTTLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> MedipalResult<Self> {
        let sender = settings.from.as_deref().unwrap_or(&settings.username);
        let from: Mailbox = format!("Medipal <{}>", sender)
            .parse()
            .map_err(|e| MedipalError::Internal(format!("invalid sender address {}: {}", sender, e)))?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| MedipalError::Internal(format!("invalid SMTP relay {}: {}", settings.host, e)))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username.clone(), settings.password.clone()))
            .build();

        info!("Mail goes through {}:{}", settings.host, settings.port);
        Ok(SmtpMailer { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: Email) -> MedipalResult<()> {
        let to: Mailbox = email
            .to
            .parse()
            .map_err(|e| MedipalError::Upstream(format!("invalid recipient {}: {}", email.to, e)))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| MedipalError::Internal(format!("could not build message: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MedipalError::Upstream(format!("SMTP send to {} failed: {}", email.to, e)))?;
        debug!("Mail '{}' sent to {}", email.subject, email.to);
        Ok(())
    }
}
