//! Page fetching for one last-name initial.
//!
//! Drives the directory's search form through [`BrowserActions`] and returns
//! the serialized results table. Failures are returned as-is; retry policy
//! belongs to the caller.

use intouch_browser::{BrowserActions, Result};
use intouch_core::{BrowserConfig, DirectoryConfig, LastNameInitial, SyncConfig};
use std::time::{Duration, Instant};

/// Waits applied while fetching one page.
#[derive(Debug, Clone)]
pub struct FetchTiming {
    /// Minimum pause after submitting the search
    pub settle_delay: Duration,
    /// Limit for each element-visibility wait
    pub element_timeout: Duration,
    /// Pause between results-table row counts
    pub population_poll: Duration,
    /// Limit for the row count to settle
    pub population_timeout: Duration,
}

impl FetchTiming {
    /// Build timings from the browser and sync sections of the config.
    #[must_use]
    pub fn from_config(browser: &BrowserConfig, sync: &SyncConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(sync.settle_delay_ms),
            element_timeout: Duration::from_millis(browser.element_timeout_ms),
            population_poll: Duration::from_millis(sync.population_poll_ms),
            population_timeout: Duration::from_millis(sync.population_timeout_ms),
        }
    }
}

/// Fetches the results table for one initial over a borrowed browser.
pub struct PageFetcher<'a, B: ?Sized> {
    browser: &'a B,
    directory: &'a DirectoryConfig,
    timing: FetchTiming,
}

impl<'a, B: BrowserActions + ?Sized> PageFetcher<'a, B> {
    /// Create a fetcher for `directory`.
    pub fn new(browser: &'a B, directory: &'a DirectoryConfig, timing: FetchTiming) -> Self {
        Self {
            browser,
            directory,
            timing,
        }
    }

    /// Search for `initial` and return the results table markup.
    pub async fn fetch(&self, initial: LastNameInitial) -> Result<String> {
        let directory = self.directory;
        tracing::info!("Scraping all inmates whose last name starts with {}", initial);

        self.browser.navigate(&directory.entry_url).await?;
        self.browser
            .wait_for_visible(&directory.search_form, self.timing.element_timeout)
            .await?;
        self.browser
            .send_keys(&directory.last_name_input, &initial.to_string())
            .await?;
        self.browser.click(&directory.submit_button).await?;

        // The table fills in asynchronously after submit
        tokio::time::sleep(self.timing.settle_delay).await;

        self.browser
            .wait_for_visible(&directory.results_table, self.timing.element_timeout)
            .await?;
        let rows = self.wait_for_population().await?;
        tracing::debug!(%initial, rows, "Results table populated");

        self.browser.outer_html(&directory.results_table).await
    }

    /// Poll the table's row count until it is non-zero and unchanged across
    /// two readings, or until the population timeout. Returns the last count.
    async fn wait_for_population(&self) -> Result<usize> {
        let rows_selector = format!("{} tr", self.directory.results_table);
        let started = Instant::now();
        let mut previous = None;

        loop {
            let count = self.browser.count_elements(&rows_selector).await?;
            if count > 0 && previous == Some(count) {
                return Ok(count);
            }
            if started.elapsed() >= self.timing.population_timeout {
                tracing::debug!(
                    count,
                    "Row count did not settle within {:?}; extracting as-is",
                    self.timing.population_timeout
                );
                return Ok(count);
            }
            previous = Some(count);
            tokio::time::sleep(self.timing.population_poll).await;
        }
    }
}
