//! Alphabet crawl over the directory.
//!
//! Visits `A` through `Z` in order on a single browser session. A failing
//! letter contributes nothing and the crawl moves on; the session is shut
//! down on every exit path.

use crate::error::{Result, SyncError};
use crate::facility::FacilityDirectory;
use crate::fetcher::{FetchTiming, PageFetcher};
use crate::parser::RosterParser;
use intouch_browser::BrowserSession;
use intouch_core::{DirectoryConfig, LastNameInitial, ScrapedRecord};
use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;

/// What happened for one letter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LetterOutcome {
    Scraped { records: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LetterReport {
    #[serde(serialize_with = "serialize_initial")]
    pub initial: LastNameInitial,
    #[serde(flatten)]
    pub outcome: LetterOutcome,
}

fn serialize_initial<S: Serializer>(
    initial: &LastNameInitial,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_char(initial.as_char())
}

/// Per-letter results of a completed crawl, in crawl order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    pub letters: Vec<LetterReport>,
}

impl CrawlReport {
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.letters
            .iter()
            .map(|l| match l.outcome {
                LetterOutcome::Scraped { records } => records,
                LetterOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.letters
            .iter()
            .filter(|l| matches!(l.outcome, LetterOutcome::Failed { .. }))
            .count()
    }

    /// Whether every attempted letter failed. False for an empty report.
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.letters.is_empty() && self.failed_count() == self.letters.len()
    }
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<ScrapedRecord>,
    pub report: CrawlReport,
}

pub struct RosterCrawler<'a> {
    directory: &'a DirectoryConfig,
    timing: FetchTiming,
    facilities: &'a FacilityDirectory,
}

impl<'a> RosterCrawler<'a> {
    #[must_use]
    pub fn new(
        directory: &'a DirectoryConfig,
        timing: FetchTiming,
        facilities: &'a FacilityDirectory,
    ) -> Self {
        Self {
            directory,
            timing,
            facilities,
        }
    }

    /// Crawl every initial on `session`, then shut the session down.
    ///
    /// Returns [`SyncError::Cancelled`] if `cancel` fires before the last
    /// letter completes. A shutdown failure after an otherwise successful
    /// crawl is reported as [`SyncError::Session`].
    pub async fn crawl<S: BrowserSession>(
        &self,
        mut session: S,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome> {
        let result = self.crawl_letters(&session, cancel).await;

        match (result, session.shutdown().await) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(_), Err(e)) => Err(SyncError::Session(e)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(shutdown_err)) => {
                tracing::warn!("Browser shutdown failed after crawl error: {}", shutdown_err);
                Err(e)
            }
        }
    }

    async fn crawl_letters<S: BrowserSession>(
        &self,
        session: &S,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome> {
        let fetcher = PageFetcher::new(session, self.directory, self.timing.clone());
        let parser = RosterParser::new(self.facilities);
        let mut records = Vec::new();
        let mut report = CrawlReport::default();

        for initial in LastNameInitial::all() {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let letter = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SyncError::Cancelled),
                letter = Self::crawl_letter(&fetcher, &parser, initial) => letter,
            };

            let outcome = match letter {
                Ok(mut letter_records) => {
                    tracing::info!("{} : {}", initial, letter_records.len());
                    let outcome = LetterOutcome::Scraped {
                        records: letter_records.len(),
                    };
                    records.append(&mut letter_records);
                    outcome
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    LetterOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.letters.push(LetterReport { initial, outcome });
        }

        tracing::info!(
            failed_letters = report.failed_count(),
            "All: {}",
            records.len()
        );
        Ok(CrawlOutcome { records, report })
    }

    async fn crawl_letter<S: BrowserSession>(
        fetcher: &PageFetcher<'_, S>,
        parser: &RosterParser<'_>,
        initial: LastNameInitial,
    ) -> Result<Vec<ScrapedRecord>> {
        let markup = fetcher
            .fetch(initial)
            .await
            .map_err(|source| SyncError::Fetch { initial, source })?;
        parser
            .parse(&markup)
            .map_err(|source| SyncError::Parse { initial, source })
    }
}
