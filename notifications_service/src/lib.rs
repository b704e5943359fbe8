// notifications_service/src/lib.rs

use async_trait::async_trait;
use models::errors::MedipalResult;

pub mod log_mailer;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;
pub mod smtp;
pub mod templates;

pub use log_mailer::LogMailer;
#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingMailer;
pub use smtp::{SmtpMailer, SmtpSettings};

/// A plain-text message ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Anything that can deliver an [`Email`].
///
/// Failures surface as `MedipalError::Upstream`. Callers decide whether a
/// failed send is fatal (password reset) or only worth a warning
/// (verification notices).
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> MedipalResult<()>;
}
