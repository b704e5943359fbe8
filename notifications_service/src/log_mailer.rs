// notifications_service/src/log_mailer.rs

use async_trait::async_trait;
use models::errors::{MedipalError, MedipalResult};
use tracing::warn;

use crate::{Email, Mailer};

/// Stand-in used when no SMTP relay is configured. Every send is logged and
/// reported as an upstream failure, so callers behave exactly as they would
/// with a relay that is down.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> MedipalResult<()> {
        warn!("SMTP is not configured, dropping mail to {} ({})", email.to, email.subject);
        Err(MedipalError::Upstream("mail transport is not configured".into()))
    }
}
