// storage/src/lib.rs

//! Relational store behind the Medipal API.
//!
//! Every operation that writes more than one row runs inside a single sqlx
//! transaction. Helpers that must take part in a caller's transaction accept
//! `&mut SqliteConnection`, so they work with both `&mut *tx` and a pooled
//! connection.
//!
//! Those transactions start with `BEGIN IMMEDIATE`, so concurrent writers
//! queue on the busy timeout rather than failing on a lock upgrade.

use std::str::FromStr;
use std::time::Duration;

use models::errors::{MedipalError, MedipalResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::info;

pub mod admins;
pub mod doctors;
pub mod medicines;
pub mod otps;
pub mod patients;
pub mod prescriptions;
pub mod sessions;

pub use sessions::SessionRecord;

#[cfg(test)]
pub(crate) mod fixtures;

const SCHEMA: &str = include_str!("schema.sql");

/// How long a writer waits for the database lock before giving up.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to the database. Cheap to clone, the pool is reference counted.
#[derive(Clone, Debug)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Opens (creating if needed) the database at `url` and installs the schema.
    pub async fn connect(url: &str) -> MedipalResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // An in-memory database lives and dies with its connection.
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(8)
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await?
        };

        let storage = Storage { pool };
        storage.migrate().await?;
        info!("Connected to database at {}", url);
        Ok(storage)
    }

    /// Fresh private database.
    pub async fn in_memory() -> MedipalResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Transaction holding the write lock from its first statement.
    pub(crate) async fn begin_write(&self) -> MedipalResult<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    async fn migrate(&self) -> MedipalResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Cheap liveness probe for `/health`.
    pub async fn ping(&self) -> MedipalResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Maps a unique-constraint violation to `DuplicateEntity`, anything else to a
/// database error.
pub(crate) fn unique_or_db(err: sqlx::Error, what: impl Into<String>) -> MedipalError {
    let unique = err
        .as_database_error()
        .map_or(false, |db| db.is_unique_violation());
    if unique {
        MedipalError::DuplicateEntity(what.into())
    } else {
        MedipalError::from(err)
    }
}

/// A stored value that no longer parses into its domain type.
pub(crate) fn corrupt(what: impl std::fmt::Display) -> MedipalError {
    MedipalError::Storage(format!("corrupt row: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_database_has_schema() {
        let storage = Storage::in_memory().await.unwrap();
        storage.ping().await.unwrap();
        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
                .fetch_all(storage.pool())
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"prescriptions"));
        assert!(names.contains(&"medicine_timings"));
        assert!(names.contains(&"sessions"));
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let storage = Storage::in_memory().await.unwrap();
        let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(storage.pool()).await.unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn schema_install_is_idempotent() {
        let storage = Storage::in_memory().await.unwrap();
        storage.migrate().await.unwrap();
    }
}
