//! InTouch Roster - inmate roster synchronization pipeline.
//!
//! Crawls the public inmate directory one last-name initial at a time,
//! parses each results table into records with resolved facilities, and
//! reconciles the complete crawl against the persisted roster in a single
//! transaction.
//!
//! # Pipeline
//!
//! - [`FacilityDirectory`] maps free-text facility labels to canonical records
//! - [`PageFetcher`] drives the search form for one initial
//! - [`RosterParser`] turns a results table into [`ScrapedRecord`]s
//! - [`RosterCrawler`] runs `A` through `Z` on one browser session
//! - [`RosterReconciler`] applies the mark-inactive/insert/update diff
//!
//! # Example
//!
//! ```rust,ignore
//! use intouch_roster::run_roster_sync;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let summary = run_roster_sync(&config, &db, &cancel).await?;
//! println!("scraped {} inmates", summary.scraped);
//! ```
//!
//! [`ScrapedRecord`]: intouch_core::ScrapedRecord

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]

#[allow(missing_docs)]
pub mod crawler;
#[allow(missing_docs)]
pub mod error;
pub mod facility;
pub mod fetcher;
#[allow(missing_docs)]
pub mod parser;
#[allow(missing_docs)]
pub mod reconciler;
#[allow(missing_docs)]
pub mod store;
#[allow(missing_docs)]
pub mod sync;

// Re-export commonly used types
pub use crawler::{CrawlOutcome, CrawlReport, LetterOutcome, LetterReport, RosterCrawler};
pub use error::{ParseError, Result, SyncError};
pub use facility::FacilityDirectory;
pub use fetcher::{FetchTiming, PageFetcher};
pub use parser::RosterParser;
pub use reconciler::{ReconcileSummary, RosterDiff, RosterReconciler};
pub use store::RosterStore;
pub use sync::{engine_options, run_roster_sync, RosterSync, SyncSummary};
