//! Bookkeeping for roster sync invocations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{DatabaseError, Result};

/// One invocation of the roster sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRun {
    /// Unique identifier for the run
    pub id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished (if finished)
    pub completed_at: Option<DateTime<Utc>>,
    /// Current status of the run
    pub status: SyncRunStatus,
    /// Counters recorded at completion
    pub stats: SyncRunStats,
    /// Error message if the run failed
    pub error_message: Option<String>,
}

/// Counters recorded when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRunStats {
    /// Letters whose fetch or parse failed
    pub letters_failed: u32,
    /// Records accumulated across the crawl
    pub scraped: u64,
    /// New inmates inserted
    pub inserted: u64,
    /// Existing inmates re-activated or moved
    pub updated: u64,
    /// Inmates flipped to inactive
    pub deactivated: u64,
}

/// Status of a sync run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncRunStatus {
    /// Run is in progress
    InProgress,
    /// Run committed its reconciliation
    Completed,
    /// Run stopped on a fatal error
    Failed,
    /// Run was cancelled before committing
    Cancelled,
}

impl std::fmt::Display for SyncRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "InProgress"),
            Self::Completed => write!(f, "Completed"),
            Self::Failed => write!(f, "Failed"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl SyncRunStatus {
    /// Parse from string representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "InProgress" => Some(Self::InProgress),
            "Completed" => Some(Self::Completed),
            "Failed" => Some(Self::Failed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Record the start of a sync run.
///
/// # Errors
/// Returns an error if the insert fails.
pub async fn create_sync_run(pool: &SqlitePool) -> Result<SyncRun> {
    let id = uuid::Uuid::new_v4().to_string();
    let started_at = Utc::now();
    let status = SyncRunStatus::InProgress;

    sqlx::query("INSERT INTO sync_runs (id, started_at, status) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(started_at.to_rfc3339())
        .bind(status.to_string())
        .execute(pool)
        .await?;

    Ok(SyncRun {
        id,
        started_at,
        completed_at: None,
        status,
        stats: SyncRunStats::default(),
        error_message: None,
    })
}

/// Mark a run completed with its counters.
///
/// # Errors
/// Returns `DatabaseError::NotFoundWithMessage` if the run does not exist.
pub async fn complete_sync_run(pool: &SqlitePool, run_id: &str, stats: SyncRunStats) -> Result<()> {
    let result = sqlx::query(
        "UPDATE sync_runs
         SET status = ?, completed_at = ?, letters_failed = ?, scraped = ?,
             inserted = ?, updated = ?, deactivated = ?
         WHERE id = ?",
    )
    .bind(SyncRunStatus::Completed.to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(i64::from(stats.letters_failed))
    .bind(to_i64(stats.scraped))
    .bind(to_i64(stats.inserted))
    .bind(to_i64(stats.updated))
    .bind(to_i64(stats.deactivated))
    .bind(run_id)
    .execute(pool)
    .await?;

    ensure_found(result.rows_affected(), run_id)
}

/// Mark a run `Failed` or `Cancelled` with a message.
///
/// # Errors
/// Returns `DatabaseError::NotFoundWithMessage` if the run does not exist.
pub async fn finish_sync_run_with_error(
    pool: &SqlitePool,
    run_id: &str,
    status: SyncRunStatus,
    error_message: &str,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE sync_runs SET status = ?, completed_at = ?, error_message = ? WHERE id = ?",
    )
    .bind(status.to_string())
    .bind(Utc::now().to_rfc3339())
    .bind(error_message)
    .bind(run_id)
    .execute(pool)
    .await?;

    ensure_found(result.rows_affected(), run_id)
}

/// The most recently started run, if any.
///
/// # Errors
/// Returns `DatabaseError` if the query fails or a stored value is invalid.
pub async fn latest_sync_run(pool: &SqlitePool) -> Result<Option<SyncRun>> {
    let row = sqlx::query(
        "SELECT id, started_at, completed_at, status, letters_failed, scraped, inserted,
                updated, deactivated, error_message
         FROM sync_runs
         ORDER BY started_at DESC
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(sync_run_from_row).transpose()
}

fn sync_run_from_row(row: &SqliteRow) -> Result<SyncRun> {
    let status: String = row.try_get("status")?;
    let status = SyncRunStatus::parse(&status)
        .ok_or_else(|| DatabaseError::Decode(format!("invalid sync run status '{status}'")))?;

    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(SyncRun {
        id: row.try_get("id")?,
        started_at: parse_timestamp(&row.try_get::<String, _>("started_at")?)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        status,
        stats: SyncRunStats {
            letters_failed: u32::try_from(row.try_get::<i64, _>("letters_failed")?)
                .map_err(|e| DatabaseError::Decode(e.to_string()))?,
            scraped: from_i64(row.try_get("scraped")?)?,
            inserted: from_i64(row.try_get("inserted")?)?,
            updated: from_i64(row.try_get("updated")?)?,
            deactivated: from_i64(row.try_get("deactivated")?)?,
        },
        error_message: row.try_get("error_message")?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{value}': {e}")))
}

fn ensure_found(rows_affected: u64, run_id: &str) -> Result<()> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFoundWithMessage(format!(
            "Sync run '{run_id}' not found"
        )));
    }
    Ok(())
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_i64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|e| DatabaseError::Decode(e.to_string()))
}
