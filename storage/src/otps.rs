// storage/src/otps.rs

use chrono::{DateTime, Utc};
use models::errors::{MedipalError, MedipalResult, ValidationError};
use tracing::{debug, info};

use crate::Storage;

impl Storage {
    /// Stores the digest of a freshly issued code, replacing any earlier one
    /// for the same email.
    pub async fn store_otp(&self, email: &str, otp_digest: &str, expires_at: DateTime<Utc>) -> MedipalResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_otps (email, otp_digest, expires_at) VALUES (?, ?, ?) \
             ON CONFLICT(email) DO UPDATE SET otp_digest = excluded.otp_digest, expires_at = excluded.expires_at",
        )
        .bind(email)
        .bind(otp_digest)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        debug!("Stored reset code for {}", email);
        Ok(())
    }

    pub async fn delete_otp(&self, email: &str) -> MedipalResult<()> {
        sqlx::query("DELETE FROM password_reset_otps WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Checks the code for `email` and, when it matches and has not expired,
    /// consumes it and sets the doctor's new password hash in the same
    /// transaction. A wrong, missing, used or expired code is
    /// `InvalidOrExpiredOtp`.
    pub async fn reset_password_with_otp(
        &self,
        email: &str,
        otp_digest: &str,
        now: DateTime<Utc>,
        new_password_hash: &str,
    ) -> MedipalResult<()> {
        let mut tx = self.begin_write().await?;

        let stored: Option<(String, DateTime<Utc>)> =
            sqlx::query_as("SELECT otp_digest, expires_at FROM password_reset_otps WHERE email = ?")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?;
        let (expected, expires_at) = stored.ok_or(ValidationError::InvalidOrExpiredOtp)?;

        if expires_at <= now {
            sqlx::query("DELETE FROM password_reset_otps WHERE email = ?")
                .bind(email)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Err(ValidationError::InvalidOrExpiredOtp.into());
        }
        if expected != otp_digest {
            return Err(ValidationError::InvalidOrExpiredOtp.into());
        }

        let updated = sqlx::query("UPDATE doctors SET password_hash = ? WHERE email = ?")
            .bind(new_password_hash)
            .bind(email)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Err(MedipalError::not_found(format!("doctor with email {}", email)));
        }
        sqlx::query("DELETE FROM password_reset_otps WHERE email = ?")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!("Password reset for {}", email);
        Ok(())
    }
}
