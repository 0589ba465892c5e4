//! InTouch Database Layer
//!
//! Provides `SQLite` access for the roster pipeline using `SQLx` with embedded
//! migrations.
//!
//! # Tables
//!
//! - `facilities`: canonical facility reference data (read-only to the sync)
//! - `inmates`: the persisted roster, unique on `(state, inmate_number)`
//! - `sync_runs`: one row per roster sync invocation
//!
//! # Example
//!
//! ```ignore
//! use intouch_db::{inmates, Database};
//!
//! let db = Database::connect("sqlite://intouch.db").await?;
//! db.run_migrations().await?;
//! let roster = inmates::list_inmates(db.pool(), None).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod facilities;
pub mod inmates;
pub mod migrations;
/// Sync run bookkeeping for roster sync invocations.
pub mod sync_runs;

// Re-export commonly used types
pub use error::{DatabaseError, Result};
pub use inmates::{BatchOutcome, RosterBatch};

use sqlx::{Pool, Sqlite};

/// High-level database handle wrapping the connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open a database at `url` (a path, `sqlite://` URL, or `:memory:`).
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the database cannot be opened.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = connection::connect(url).await?;
        Ok(Self { pool })
    }

    /// Open a fresh in-memory database with all migrations applied.
    ///
    /// # Errors
    /// Returns `DatabaseError` if opening or migrating fails.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Self::connect(":memory:").await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
