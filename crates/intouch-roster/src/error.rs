use intouch_browser::BrowserError;
use intouch_core::LastNameInitial;
use intouch_db::DatabaseError;
use thiserror::Error;

/// Failure to interpret a results page at all.
///
/// Rows that are merely skipped (wrong cell count, unknown facility) are not
/// errors.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no results table in markup")]
    MissingTable,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed for letter {initial}: {source}")]
    Fetch {
        initial: LastNameInitial,
        source: BrowserError,
    },

    #[error("unreadable results for letter {initial}: {source}")]
    Parse {
        initial: LastNameInitial,
        source: ParseError,
    },

    #[error("reconciliation failed: {0}")]
    Reconcile(#[from] DatabaseError),

    #[error("browser session error: {0}")]
    Session(#[source] BrowserError),

    #[error("roster sync cancelled")]
    Cancelled,

    #[error("every letter failed to fetch or parse; refusing to reconcile")]
    SystemicFetchFailure,
}

pub type Result<T> = std::result::Result<T, SyncError>;
