//! Shared types used across the roster pipeline.
//!
//! This module defines the roster domain newtypes and records that flow
//! between the parser, the reconciler and the database layer.

use crate::error::IntouchError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Jurisdiction code, two uppercase ASCII letters (e.g. `CT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StateCode(String);

impl StateCode {
    /// Create a new `StateCode`.
    ///
    /// # Errors
    /// Returns error if the code is not exactly two uppercase ASCII letters.
    pub fn new(code: impl Into<String>) -> Result<Self, IntouchError> {
        let code = code.into();
        static STATE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = STATE_REGEX.get_or_init(|| Regex::new(r"^[A-Z]{2}$").expect("valid regex"));

        if regex.is_match(&code) {
            Ok(Self(code))
        } else {
            Err(IntouchError::Validation(format!(
                "invalid state code: must be two uppercase letters, got '{code}'"
            )))
        }
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for StateCode {
    fn default() -> Self {
        Self("CT".to_string())
    }
}

impl TryFrom<String> for StateCode {
    type Error = IntouchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StateCode> for String {
    fn from(code: StateCode) -> Self {
        code.0
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single last-name initial submitted to the directory search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LastNameInitial(char);

impl LastNameInitial {
    /// Create an initial from a letter. Lowercase letters are upper-cased.
    ///
    /// # Errors
    /// Returns error if `letter` is not an ASCII letter.
    pub fn new(letter: char) -> Result<Self, IntouchError> {
        if letter.is_ascii_alphabetic() {
            Ok(Self(letter.to_ascii_uppercase()))
        } else {
            Err(IntouchError::Validation(format!(
                "invalid last-name initial: '{letter}'"
            )))
        }
    }

    /// All 26 initials in crawl order, `A` through `Z`.
    pub fn all() -> impl Iterator<Item = Self> {
        (b'A'..=b'Z').map(|b| Self(char::from(b)))
    }

    /// The initial as a `char`.
    #[must_use]
    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for LastNameInitial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Surrogate identifier for an inmate row.
///
/// Assigned once on first observation and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InmateId(String);

impl InmateId {
    /// Create a new random `InmateId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Wrap an identifier loaded from storage.
    #[must_use]
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InmateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Natural identity of an inmate: `(state, inmate_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    /// Jurisdiction code
    pub state: StateCode,
    /// The jurisdiction's own identifier for the person
    pub inmate_number: String,
}

impl NaturalKey {
    /// Build a key from its parts.
    #[must_use]
    pub fn new(state: StateCode, inmate_number: impl Into<String>) -> Self {
        Self {
            state,
            inmate_number: inmate_number.into(),
        }
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.state, self.inmate_number)
    }
}

/// A persisted roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inmate {
    /// Surrogate identifier referenced by other subsystems
    pub id: InmateId,
    /// Jurisdiction code
    pub state: StateCode,
    /// The jurisdiction's identifier for the person
    pub inmate_number: String,
    /// Title-cased first name
    pub first_name: String,
    /// Title-cased last name
    pub last_name: String,
    /// Date of birth exactly as presented by the source
    pub date_of_birth: String,
    /// Canonical facility name
    pub facility: String,
    /// Whether the person appeared in the most recent completed crawl
    pub active: bool,
}

impl Inmate {
    /// The natural key of this row.
    #[must_use]
    pub fn key(&self) -> NaturalKey {
        NaturalKey::new(self.state.clone(), self.inmate_number.clone())
    }

    /// Display name, `"First Last"`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Canonical facility reference record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facility {
    /// Canonical name (primary key)
    pub name: String,
    /// Short name matched against scraped facility text
    pub short_name: String,
    /// First street-address line
    pub address_line1: String,
    /// Optional second street-address line
    pub address_line2: Option<String>,
    /// City
    pub city: String,
    /// State or province
    pub state: String,
    /// ZIP/postal code
    pub postal_code: String,
    /// Mailing-address identifier in the mail provider's test environment
    pub test_address_id: Option<String>,
    /// Mailing-address identifier in the mail provider's live environment
    pub live_address_id: Option<String>,
}

/// One row scraped from the directory, facility already resolved.
///
/// Never persisted directly; always reconciled first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedRecord {
    /// The jurisdiction's identifier for the person
    pub inmate_number: String,
    /// Title-cased first name
    pub first_name: String,
    /// Title-cased last name
    pub last_name: String,
    /// Date of birth exactly as presented by the source
    pub date_of_birth: String,
    /// Canonical facility name
    pub facility: String,
}

impl ScrapedRecord {
    /// The natural key of this record within `state`.
    #[must_use]
    pub fn key(&self, state: &StateCode) -> NaturalKey {
        NaturalKey::new(state.clone(), self.inmate_number.clone())
    }
}
