// notifications_service/src/recording.rs

use std::sync::Arc;

use async_trait::async_trait;
use models::errors::{MedipalError, MedipalResult};
use tokio::sync::Mutex;

use crate::{Email, Mailer};

/// Keeps every message in memory instead of sending it. Clones share the
/// same outbox, so a test can hand one clone to the app and read the other.
#[derive(Debug, Default, Clone)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Vec<Email>>>,
    failing: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose sends all fail, recording nothing.
    pub fn failing() -> Self {
        RecordingMailer {
            outbox: Arc::default(),
            failing: true,
        }
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.outbox.lock().await.clone()
    }

    pub async fn last_to(&self, address: &str) -> Option<Email> {
        self.outbox.lock().await.iter().rev().find(|e| e.to == address).cloned()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> MedipalResult<()> {
        if self.failing {
            return Err(MedipalError::Upstream(format!("refusing to send to {}", email.to)));
        }
        self.outbox.lock().await.push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(to: &str, subject: &str) -> Email {
        Email {
            to: to.into(),
            subject: subject.into(),
            body: String::new(),
        }
    }

    #[tokio::test]
    async fn clones_share_one_outbox() {
        let mailer = RecordingMailer::new();
        let handle = mailer.clone();
        mailer.send(email("a@example.com", "first")).await.unwrap();
        mailer.send(email("a@example.com", "second")).await.unwrap();

        assert_eq!(handle.sent().await.len(), 2);
        assert_eq!(handle.last_to("a@example.com").await.unwrap().subject, "second");
        assert!(handle.last_to("b@example.com").await.is_none());
    }

    #[tokio::test]
    async fn failing_mailer_records_nothing() {
        let mailer = RecordingMailer::failing();
        assert!(mailer.send(email("a@example.com", "x")).await.is_err());
        assert!(mailer.sent().await.is_empty());
    }
}
