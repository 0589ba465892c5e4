//! End-to-end roster sync: load facilities, crawl, guard, reconcile.

use crate::crawler::{CrawlReport, RosterCrawler};
use crate::error::{Result, SyncError};
use crate::facility::FacilityDirectory;
use crate::fetcher::FetchTiming;
use crate::reconciler::{ReconcileSummary, RosterReconciler};
use crate::store::RosterStore;
use intouch_browser::{BrowserEngine, BrowserSession, EngineOptions};
use intouch_core::{AppConfig, BrowserConfig};
use intouch_db::sync_runs::{self, SyncRunStats, SyncRunStatus};
use intouch_db::Database;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a committed sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub crawl: CrawlReport,
    pub scraped: usize,
    pub reconcile: ReconcileSummary,
}

impl SyncSummary {
    /// Counters for the sync run record.
    #[must_use]
    pub fn stats(&self) -> SyncRunStats {
        SyncRunStats {
            letters_failed: u32::try_from(self.crawl.failed_count()).unwrap_or(u32::MAX),
            scraped: self.scraped as u64,
            inserted: self.reconcile.inserted,
            updated: self.reconcile.updated,
            deactivated: self.reconcile.deactivated,
        }
    }
}

/// One sync over a store, with the browser supplied by a launcher.
pub struct RosterSync<'a, S: ?Sized> {
    store: &'a S,
    config: &'a AppConfig,
}

impl<'a, S: RosterStore + ?Sized> RosterSync<'a, S> {
    pub fn new(store: &'a S, config: &'a AppConfig) -> Self {
        Self { store, config }
    }

    /// Run the pipeline once.
    ///
    /// Facilities are loaded before `launch` is called, so a store failure
    /// never leaves a browser running. Once launched, the session is shut
    /// down before this returns, whatever the outcome.
    pub async fn run<F, Fut, B>(&self, launch: F, cancel: &CancellationToken) -> Result<SyncSummary>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = intouch_browser::Result<B>>,
        B: BrowserSession,
    {
        let facilities = FacilityDirectory::new(self.store.list_facilities().await?);
        if facilities.is_empty() {
            tracing::warn!("No facilities loaded; every scraped row will be dropped");
        } else {
            tracing::debug!("Loaded {} facilities", facilities.len());
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let session = launch().await.map_err(SyncError::Session)?;
        let timing = FetchTiming::from_config(&self.config.browser, &self.config.sync);
        let crawler = RosterCrawler::new(&self.config.directory, timing, &facilities);
        let crawl = crawler.crawl(session, cancel).await?;

        if crawl.report.all_failed() && self.config.sync.abort_on_total_failure {
            tracing::error!("Every letter failed; leaving the persisted roster untouched");
            return Err(SyncError::SystemicFetchFailure);
        }
        if crawl.records.is_empty() {
            tracing::warn!("Crawl returned no inmates; all active inmates will be deactivated");
        }

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let reconciler = RosterReconciler::new(self.store, self.config.directory.state.clone());
        let reconcile = reconciler.reconcile(&crawl.records).await?;

        Ok(SyncSummary {
            scraped: crawl.records.len(),
            crawl: crawl.report,
            reconcile,
        })
    }
}

/// Browser launch options derived from configuration.
#[must_use]
pub fn engine_options(config: &BrowserConfig) -> EngineOptions {
    EngineOptions {
        headless: config.headless,
        window_width: config.window_width,
        window_height: config.window_height,
        navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        ..EngineOptions::default()
    }
}

/// Run one full roster sync against `db` with a Chromium session, recording
/// the run in `sync_runs`.
pub async fn run_roster_sync(
    config: &AppConfig,
    db: &Database,
    cancel: &CancellationToken,
) -> Result<SyncSummary> {
    let run = sync_runs::create_sync_run(db.pool()).await?;
    tracing::info!(run_id = %run.id, state = %config.directory.state, "Starting roster sync");

    let options = engine_options(&config.browser);
    let result = RosterSync::new(db, config)
        .run(|| BrowserEngine::launch(options), cancel)
        .await;

    let bookkeeping = match &result {
        Ok(summary) => sync_runs::complete_sync_run(db.pool(), &run.id, summary.stats()).await,
        Err(SyncError::Cancelled) => {
            sync_runs::finish_sync_run_with_error(
                db.pool(),
                &run.id,
                SyncRunStatus::Cancelled,
                "cancelled",
            )
            .await
        }
        Err(e) => {
            sync_runs::finish_sync_run_with_error(
                db.pool(),
                &run.id,
                SyncRunStatus::Failed,
                &e.to_string(),
            )
            .await
        }
    };
    if let Err(e) = bookkeeping {
        tracing::warn!(run_id = %run.id, "Failed to record sync run outcome: {}", e);
    }

    match &result {
        Ok(summary) => tracing::info!(
            run_id = %run.id,
            scraped = summary.scraped,
            letters_failed = summary.crawl.failed_count(),
            "Roster sync completed"
        ),
        Err(e) => tracing::error!(run_id = %run.id, "Roster sync failed: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{LetterOutcome, LetterReport};
    use intouch_core::LastNameInitial;

    #[test]
    fn test_engine_options_from_config() {
        let config = BrowserConfig {
            headless: false,
            window_width: 800,
            window_height: 600,
            navigation_timeout_secs: 7,
            element_timeout_ms: 1,
        };
        let options = engine_options(&config);
        assert!(!options.headless);
        assert_eq!(options.window_width, 800);
        assert_eq!(options.window_height, 600);
        assert_eq!(options.navigation_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_summary_stats() {
        let summary = SyncSummary {
            crawl: CrawlReport {
                letters: vec![LetterReport {
                    initial: LastNameInitial::new('A').expect("valid initial"),
                    outcome: LetterOutcome::Failed {
                        reason: "timeout".to_string(),
                    },
                }],
            },
            scraped: 12,
            reconcile: ReconcileSummary {
                inserted: 3,
                updated: 2,
                deactivated: 1,
                unchanged: 6,
            },
        };
        assert_eq!(
            summary.stats(),
            SyncRunStats {
                letters_failed: 1,
                scraped: 12,
                inserted: 3,
                updated: 2,
                deactivated: 1,
            }
        );
    }
}
