#![allow(dead_code)]

use async_trait::async_trait;
use intouch_browser::{BrowserActions, BrowserError, BrowserSession, Result};
use intouch_core::{AppConfig, Facility};
use intouch_db::{facilities, Database};
use intouch_roster::FetchTiming;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// What the directory serves for one initial.
#[derive(Debug, Clone)]
pub enum FakePage {
    /// A results table with this markup
    Table(String),
    /// The results table never becomes visible
    FailFetch,
    /// The page loads but contains no results table
    Unparseable,
    /// The results-table wait never completes
    Hang,
}

#[derive(Default)]
struct FakeState {
    pages: HashMap<char, FakePage>,
    default_page: Option<FakePage>,
    current: Option<char>,
    fetched: Vec<char>,
    shutdowns: usize,
    fail_shutdown: bool,
    closed: bool,
    cancel_on: Option<(char, CancellationToken)>,
}

impl FakeState {
    fn page(&self, letter: char) -> Option<FakePage> {
        self.pages
            .get(&letter)
            .cloned()
            .or_else(|| self.default_page.clone())
    }
}

/// Scripted stand-in for the directory site behind a browser session.
///
/// Letters with no page serve an empty results table.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, letter: char, page: FakePage) -> Self {
        self.lock().pages.insert(letter, page);
        self
    }

    pub fn with_table(self, letter: char, rows: &[Row<'_>]) -> Self {
        self.with_page(letter, FakePage::Table(results_markup(rows)))
    }

    /// Serve `page` for every letter without an explicit page.
    pub fn with_default_page(self, page: FakePage) -> Self {
        self.lock().default_page = Some(page);
        self
    }

    pub fn failing_shutdown(self) -> Self {
        self.lock().fail_shutdown = true;
        self
    }

    /// Cancel `token` as soon as `letter` is typed into the search form.
    pub fn cancel_on(self, letter: char, token: CancellationToken) -> Self {
        self.lock().cancel_on = Some((letter, token));
        self
    }

    pub fn fetched(&self) -> String {
        self.lock().fetched.iter().collect()
    }

    pub fn shutdowns(&self) -> usize {
        self.lock().shutdowns
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("lock fake browser state")
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lock().closed {
            return Err(BrowserError::SessionClosed);
        }
        Ok(())
    }

    fn current_page(&self) -> Option<FakePage> {
        let state = self.lock();
        state.current.and_then(|letter| state.page(letter))
    }
}

#[async_trait]
impl BrowserActions for FakeBrowser {
    async fn navigate(&self, _url: &str) -> Result<()> {
        self.ensure_open()?;
        self.lock().current = None;
        Ok(())
    }

    async fn wait_for_visible(&self, selector: &str, _timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        if self.lock().current.is_none() {
            // Search form
            return Ok(());
        }
        match self.current_page() {
            Some(FakePage::FailFetch) => Err(BrowserError::Timeout(format!(
                "{selector} not visible"
            ))),
            Some(FakePage::Hang) => std::future::pending::<Result<()>>().await,
            _ => Ok(()),
        }
    }

    async fn send_keys(&self, _selector: &str, text: &str) -> Result<()> {
        self.ensure_open()?;
        let letter = text.chars().next().unwrap_or('?');
        let token = {
            let mut state = self.lock();
            state.current = Some(letter);
            state.fetched.push(letter);
            state
                .cancel_on
                .as_ref()
                .filter(|(on, _)| *on == letter)
                .map(|(_, token)| token.clone())
        };
        if let Some(token) = token {
            token.cancel();
        }
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<()> {
        self.ensure_open()
    }

    async fn count_elements(&self, _selector: &str) -> Result<usize> {
        self.ensure_open()?;
        Ok(match self.current_page() {
            Some(FakePage::Table(markup)) => markup.matches("<tr").count(),
            _ => 0,
        })
    }

    async fn outer_html(&self, _selector: &str) -> Result<String> {
        self.ensure_open()?;
        Ok(match self.current_page() {
            Some(FakePage::Table(markup)) => markup,
            Some(FakePage::Unparseable) => "<div>Down for maintenance</div>".to_string(),
            _ => results_markup(&[]),
        })
    }
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn shutdown(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.shutdowns += 1;
        state.closed = true;
        if state.fail_shutdown {
            return Err(BrowserError::ChromiumError("browser did not exit".to_string()));
        }
        Ok(())
    }
}

/// `(inmate number, "LAST,FIRST", date of birth, facility text)`
pub type Row<'a> = (&'a str, &'a str, &'a str, &'a str);

pub fn results_markup(rows: &[Row<'_>]) -> String {
    let mut markup = String::from(
        "<table summary=\"Result.\"><tr><th>Inmate Number</th><th>Name</th>\
         <th>Date of Birth</th><th>Facility</th></tr>",
    );
    for (number, name, dob, facility) in rows {
        markup.push_str(&format!(
            "<tr><td>{number}</td><td>{name}</td><td>{dob}</td><td>{facility}</td></tr>"
        ));
    }
    markup.push_str("</table>");
    markup
}

pub fn facility(name: &str, short_name: &str) -> Facility {
    Facility {
        name: name.to_string(),
        short_name: short_name.to_string(),
        address_line1: "1 Prison Rd".to_string(),
        address_line2: None,
        city: "Somers".to_string(),
        state: "CT".to_string(),
        postal_code: "06071".to_string(),
        test_address_id: None,
        live_address_id: None,
    }
}

pub fn test_facilities() -> Vec<Facility> {
    vec![
        facility("Cheshire Correctional Institution", "CHESHIRE"),
        facility("Osborn Correctional Institution", "OSBORN"),
    ]
}

pub async fn setup_test_db() -> Database {
    let db = Database::open_in_memory()
        .await
        .expect("create test database");
    for f in test_facilities() {
        facilities::insert_facility(db.pool(), &f)
            .await
            .expect("seed facility");
    }
    db
}

pub fn test_timing() -> FetchTiming {
    FetchTiming {
        settle_delay: Duration::ZERO,
        element_timeout: Duration::from_millis(100),
        population_poll: Duration::from_millis(1),
        population_timeout: Duration::from_millis(20),
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.settle_delay_ms = 0;
    config.sync.population_poll_ms = 1;
    config.sync.population_timeout_ms = 20;
    config.browser.element_timeout_ms = 100;
    config
}
