//! Database connection management.
//!
//! Builds a `SQLx` `SQLite` pool from a connection URL. In-memory databases
//! are pinned to a single long-lived connection, since every `SQLite`
//! connection to `:memory:` opens its own private database.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Whether `url` names an in-memory database.
#[must_use]
pub fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a connection pool for `url`, creating the database file if needed.
///
/// # Errors
/// Returns `DatabaseError::Open` if the URL is malformed or the database
/// cannot be opened.
pub async fn connect(url: &str) -> Result<Pool<Sqlite>> {
    let connect_options = SqliteConnectOptions::from_str(url)
        .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool_options = if is_in_memory(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(DEFAULT_MAX_CONNECTIONS)
    };

    let pool = pool_options
        .connect_with(connect_options)
        .await
        .map_err(|e| DatabaseError::Open(format!("failed to open {url}: {e}")))?;

    tracing::info!("Database pool created at {}", url);
    Ok(pool)
}
