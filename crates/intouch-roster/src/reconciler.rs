//! Roster reconciliation.
//!
//! Diffs a complete crawl against the persisted roster over the natural key
//! `(state, inmate_number)` and commits the result as one atomic batch.
//! Rows are never deleted; `active` is the only soft-delete signal.

use crate::error::Result;
use crate::store::RosterStore;
use intouch_core::{Inmate, NaturalKey, ScrapedRecord, StateCode};
use intouch_db::RosterBatch;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// The minimal set of changes bringing the persisted roster in line with a
/// crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterDiff {
    /// Active persisted rows absent from the crawl
    pub deactivate: Vec<NaturalKey>,
    /// Crawled records with no persisted row
    pub inserts: Vec<ScrapedRecord>,
    /// Crawled records whose row is inactive or at another facility
    pub updates: Vec<ScrapedRecord>,
    /// Crawled records already active at the same facility
    pub unchanged: usize,
    /// Crawled records ignored because their key was already seen
    pub duplicates: usize,
}

impl RosterDiff {
    /// Compute the diff for `state`. Persisted rows of other states are not
    /// considered.
    #[must_use]
    pub fn compute(state: &StateCode, persisted: &[Inmate], external: &[ScrapedRecord]) -> Self {
        let persisted: HashMap<NaturalKey, &Inmate> = persisted
            .iter()
            .filter(|inmate| &inmate.state == state)
            .map(|inmate| (inmate.key(), inmate))
            .collect();

        let mut diff = Self::default();
        let mut seen: HashSet<NaturalKey> = HashSet::with_capacity(external.len());

        for record in external {
            let key = record.key(state);
            if !seen.insert(key.clone()) {
                tracing::debug!(key = %key, "Ignoring duplicate record in crawl");
                diff.duplicates += 1;
                continue;
            }

            match persisted.get(&key) {
                None => diff.inserts.push(record.clone()),
                Some(existing) if existing.active && existing.facility == record.facility => {
                    diff.unchanged += 1;
                }
                Some(_) => diff.updates.push(record.clone()),
            }
        }

        let mut deactivate: Vec<NaturalKey> = persisted
            .iter()
            .filter(|(key, inmate)| inmate.active && !seen.contains(*key))
            .map(|(key, _)| key.clone())
            .collect();
        deactivate.sort();
        diff.deactivate = deactivate;

        diff
    }

    /// Whether applying the diff would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deactivate.is_empty() && self.inserts.is_empty() && self.updates.is_empty()
    }

    /// Convert into the store's batch: deactivations, then inserts and
    /// updates as upserts.
    #[must_use]
    pub fn into_batch(self, state: StateCode) -> RosterBatch {
        let mut upserts = self.inserts;
        upserts.extend(self.updates);
        RosterBatch {
            state,
            deactivate: self.deactivate,
            upserts,
        }
    }
}

/// Counts reported by a committed reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub inserted: u64,
    pub updated: u64,
    pub deactivated: u64,
    pub unchanged: u64,
}

pub struct RosterReconciler<'a, S: ?Sized> {
    store: &'a S,
    state: StateCode,
}

impl<'a, S: RosterStore + ?Sized> RosterReconciler<'a, S> {
    pub fn new(store: &'a S, state: StateCode) -> Self {
        Self { store, state }
    }

    /// Bring the persisted roster in line with `external`, a complete crawl.
    ///
    /// Either every change commits or none does.
    pub async fn reconcile(&self, external: &[ScrapedRecord]) -> Result<ReconcileSummary> {
        let persisted = self.store.list_inmates(None).await?;
        let diff = RosterDiff::compute(&self.state, &persisted, external);

        let summary = ReconcileSummary {
            inserted: diff.inserts.len() as u64,
            updated: diff.updates.len() as u64,
            deactivated: diff.deactivate.len() as u64,
            unchanged: diff.unchanged as u64,
        };

        if diff.duplicates > 0 {
            tracing::warn!(
                "Crawl contained {} duplicate inmate numbers; first occurrence kept",
                diff.duplicates
            );
        }

        if diff.is_empty() {
            tracing::info!(unchanged = summary.unchanged, "Roster already up to date");
            return Ok(summary);
        }

        let outcome = self
            .store
            .apply_roster_batch(&diff.into_batch(self.state.clone()))
            .await?;

        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            deactivated = outcome.deactivated,
            unchanged = summary.unchanged,
            "Roster reconciled"
        );
        Ok(summary)
    }
}
