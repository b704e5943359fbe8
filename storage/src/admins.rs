// storage/src/admins.rs

use models::errors::{MedipalError, MedipalResult};
use models::medical::Admin;
use sqlx::FromRow;
use tracing::info;

use crate::{unique_or_db, Storage};

#[derive(Debug, FromRow)]
struct AdminRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
}

impl From<AdminRow> for Admin {
    fn from(row: AdminRow) -> Self {
        Admin {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
        }
    }
}

impl Storage {
    pub async fn find_admin(&self, username: &str) -> MedipalResult<Option<Admin>> {
        let row: Option<AdminRow> =
            sqlx::query_as("SELECT id, username, email, password_hash FROM admins WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Admin::from))
    }

    /// Creates the admin account, or replaces the password (and the email, when
    /// one is given) of an existing one. Returns the account and whether it was
    /// newly created.
    pub async fn upsert_admin(
        &self,
        username: &str,
        email: Option<&str>,
        default_email: &str,
        password_hash: &str,
    ) -> MedipalResult<(Admin, bool)> {
        if let Some(existing) = self.find_admin(username).await? {
            let email = email.unwrap_or(&existing.email);
            sqlx::query("UPDATE admins SET password_hash = ?, email = ? WHERE id = ?")
                .bind(password_hash)
                .bind(email)
                .bind(existing.id)
                .execute(&self.pool)
                .await?;
            info!("Reset password of admin {}", username);
            let admin = self
                .find_admin(username)
                .await?
                .ok_or_else(|| MedipalError::Internal("admin vanished after update".into()))?;
            return Ok((admin, false));
        }

        let row: AdminRow = sqlx::query_as(
            "INSERT INTO admins (username, email, password_hash) VALUES (?, ?, ?) RETURNING id, username, email, password_hash",
        )
        .bind(username)
        .bind(email.unwrap_or(default_email))
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_or_db(e, format!("admin {}", username)))?;
        info!("Created admin {}", username);
        Ok((row.into(), true))
    }
}
