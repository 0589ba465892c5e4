//! Persistence seam for the roster sync.

use async_trait::async_trait;
use intouch_core::{Facility, Inmate};
use intouch_db::{facilities, inmates, BatchOutcome, Database, DatabaseError, RosterBatch};

/// Storage the sync reads from and commits to.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn list_facilities(&self) -> Result<Vec<Facility>, DatabaseError>;

    async fn list_inmates(&self, filter: Option<&str>) -> Result<Vec<Inmate>, DatabaseError>;

    /// Apply every change in `batch` or none of them.
    async fn apply_roster_batch(&self, batch: &RosterBatch) -> Result<BatchOutcome, DatabaseError>;
}

#[async_trait]
impl RosterStore for Database {
    async fn list_facilities(&self) -> Result<Vec<Facility>, DatabaseError> {
        Ok(facilities::list_facilities(self.pool()).await?)
    }

    async fn list_inmates(&self, filter: Option<&str>) -> Result<Vec<Inmate>, DatabaseError> {
        inmates::list_inmates(self.pool(), filter).await
    }

    async fn apply_roster_batch(&self, batch: &RosterBatch) -> Result<BatchOutcome, DatabaseError> {
        inmates::apply_roster_batch(self.pool(), batch).await
    }
}
