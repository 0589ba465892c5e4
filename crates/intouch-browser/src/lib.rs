//! Browser automation for the inmate directory crawl.
//!
//! Provides the minimal action set the page fetcher needs, a session trait
//! with deterministic teardown, and a headless Chromium implementation.

pub mod actions;
pub mod engine;
pub mod error;

pub use actions::{BrowserActions, BrowserSession};
pub use engine::{BrowserEngine, EngineOptions};
pub use error::{BrowserError, Result};
