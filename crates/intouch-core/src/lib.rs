//! InTouch Core - Foundation crate for the roster synchronization pipeline.
//!
//! This crate provides the shared domain types, error handling and
//! configuration management that the browser, database and roster crates
//! depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Roster newtypes and records (`StateCode`, `NaturalKey`, `Inmate`, ...)
//!
//! # Example
//!
//! ```rust
//! use intouch_core::{AppConfig, LastNameInitial};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.directory.state.as_str(), "CT");
//! assert_eq!(LastNameInitial::all().count(), 26);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BrowserConfig, DatabaseConfig, DirectoryConfig, SyncConfig};
pub use error::{ConfigError, ConfigResult, IntouchError, Result};
pub use types::{
    Facility, Inmate, InmateId, LastNameInitial, NaturalKey, ScrapedRecord, StateCode,
};
