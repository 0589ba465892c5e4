//! Configuration management for the roster sync job.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::StateCode;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/intouch/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Roster database settings
    pub database: DatabaseConfig,
    /// Inmate directory site and selectors
    pub directory: DirectoryConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Crawl timing and reconciliation policy
    pub sync: SyncConfig,
}

impl AppConfig {
    /// Load configuration from the default path, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }

        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Apply environment variable overrides from the process environment.
    ///
    /// Supports the following environment variables:
    /// - `INTOUCH_DATABASE_URL`, then `DATABASE_URL`: Override the database URL
    /// - `INTOUCH_HEADLESS`: Override browser headless mode (true/false)
    /// - `INTOUCH_STATE`: Override the jurisdiction code
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` to resolve variable names.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<Self> {
        if let Some(url) = lookup("INTOUCH_DATABASE_URL").or_else(|| lookup("DATABASE_URL")) {
            tracing::debug!("Override database.url from env");
            self.database.url = url;
        }

        if let Some(val) = lookup("INTOUCH_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(val) = lookup("INTOUCH_STATE") {
            self.directory.state =
                StateCode::new(val).map_err(|e| ConfigError::InvalidValue {
                    field: "directory.state".to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(self)
    }

    /// Check values that would make a crawl meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(invalid("database.url", "must not be empty"));
        }
        if self.directory.entry_url.trim().is_empty() {
            return Err(invalid("directory.entry_url", "must not be empty"));
        }
        if self.browser.navigation_timeout_secs == 0 {
            return Err(invalid("browser.navigation_timeout_secs", "must be positive"));
        }
        if self.browser.element_timeout_ms == 0 {
            return Err(invalid("browser.element_timeout_ms", "must be positive"));
        }
        if self.sync.population_poll_ms == 0 {
            return Err(invalid("sync.population_poll_ms", "must be positive"));
        }
        if self.sync.interval_hours == 0 {
            return Err(invalid("sync.interval_hours", "must be positive"));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/intouch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "intouch", "intouch").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/intouch`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "intouch", "intouch").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Roster database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or path (`:memory:` for in-memory)
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://intouch.db".to_string(),
        }
    }
}

/// The public inmate directory and the selectors used to drive it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Jurisdiction code stamped on every scraped inmate
    pub state: StateCode,
    /// Search entry page
    pub entry_url: String,
    /// Search form that must be visible before typing
    pub search_form: String,
    /// Last-name input field
    pub last_name_input: String,
    /// Search submit button
    pub submit_button: String,
    /// Results table whose markup is extracted
    pub results_table: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            state: StateCode::default(),
            entry_url: "http://www.ctinmateinfo.state.ct.us/".to_string(),
            search_form: "#frmSearchOp".to_string(),
            last_name_input: "#frmSearchOp tr:nth-of-type(5) td:nth-of-type(2) input".to_string(),
            submit_button: "#submit1".to_string(),
            results_table: "table[summary='Result.']".to_string(),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for an element to become visible, in milliseconds
    pub element_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            navigation_timeout_secs: 30,
            element_timeout_ms: 15_000,
        }
    }
}

/// Crawl timing and reconciliation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Minimum wait after submitting a search, in milliseconds
    pub settle_delay_ms: u64,
    /// Interval between results-table row counts, in milliseconds
    pub population_poll_ms: u64,
    /// Upper bound on waiting for the row count to settle, in milliseconds
    pub population_timeout_ms: u64,
    /// Skip reconciliation when every letter failed to fetch or parse
    pub abort_on_total_failure: bool,
    /// Hours between scheduled runs
    pub interval_hours: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            population_poll_ms: 250,
            population_timeout_ms: 10_000,
            abort_on_total_failure: true,
            interval_hours: 24,
        }
    }
}
