// storage/src/sessions.rs

use chrono::{DateTime, Utc};
use models::errors::MedipalResult;
use models::medical::Role;
use sqlx::FromRow;

use crate::{corrupt, Storage};

/// Server-side half of a session token. A token is only honoured while its
/// `jti` has a row here.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub jti: String,
    pub subject: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SessionRow {
    jti: String,
    subject: String,
    role: String,
    expires_at: DateTime<Utc>,
}

impl Storage {
    pub async fn insert_session(&self, session: &SessionRecord) -> MedipalResult<()> {
        sqlx::query("INSERT INTO sessions (jti, subject, role, expires_at) VALUES (?, ?, ?, ?)")
            .bind(&session.jti)
            .bind(&session.subject)
            .bind(session.role.as_str())
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn find_session(&self, jti: &str) -> MedipalResult<Option<SessionRecord>> {
        let row: Option<SessionRow> = sqlx::query_as("SELECT jti, subject, role, expires_at FROM sessions WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| -> MedipalResult<SessionRecord> {
            Ok(SessionRecord {
                role: row.role.parse().map_err(|_| corrupt(&row.role))?,
                jti: row.jti,
                subject: row.subject,
                expires_at: row.expires_at,
            })
        })
        .transpose()
    }

    /// Returns whether a row was removed. Missing rows are not an error.
    pub async fn delete_session(&self, jti: &str) -> MedipalResult<bool> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE jti = ?")
            .bind(jti)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    /// Drops every session that expired before `now`.
    pub async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> MedipalResult<u64> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as("SELECT jti, expires_at FROM sessions")
            .fetch_all(&self.pool)
            .await?;
        let mut purged = 0;
        for (jti, expires_at) in rows {
            if expires_at <= now && self.delete_session(&jti).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(jti: &str, expires_in: Duration) -> SessionRecord {
        SessionRecord {
            jti: jti.to_string(),
            subject: "REG-1".to_string(),
            role: Role::Doctor,
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn session_round_trip_and_idempotent_delete() {
        let storage = Storage::in_memory().await.unwrap();
        let record = session("jti-1", Duration::days(30));
        storage.insert_session(&record).await.unwrap();

        let found = storage.find_session("jti-1").await.unwrap().unwrap();
        assert_eq!(found.subject, record.subject);
        assert_eq!(found.role, Role::Doctor);
        assert_eq!((found.expires_at - record.expires_at).num_seconds(), 0);
        assert!(storage.delete_session("jti-1").await.unwrap());
        assert!(!storage.delete_session("jti-1").await.unwrap());
        assert!(storage.find_session("jti-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_purged() {
        let storage = Storage::in_memory().await.unwrap();
        storage.insert_session(&session("old", Duration::minutes(-5))).await.unwrap();
        storage.insert_session(&session("fresh", Duration::days(1))).await.unwrap();

        assert_eq!(storage.delete_expired_sessions(Utc::now()).await.unwrap(), 1);
        assert!(storage.find_session("fresh").await.unwrap().is_some());
    }
}
