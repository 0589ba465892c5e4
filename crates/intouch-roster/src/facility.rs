//! Facility resolution.
//!
//! Maps the directory's free-text facility labels onto canonical facility
//! records by case-insensitive substring match on the facility short name.

use intouch_core::Facility;

/// Read-only lookup over the canonical facilities, in directory order.
#[derive(Debug, Clone, Default)]
pub struct FacilityDirectory {
    facilities: Vec<Facility>,
    needles: Vec<String>,
}

impl FacilityDirectory {
    /// Build the lookup. Facilities are matched in the order given.
    #[must_use]
    pub fn new(facilities: Vec<Facility>) -> Self {
        let needles = facilities
            .iter()
            .map(|f| f.short_name.trim().to_uppercase())
            .collect();
        Self {
            facilities,
            needles,
        }
    }

    /// First facility whose short name occurs in `text`, ignoring case.
    ///
    /// Facilities with a blank short name never match.
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<&Facility> {
        let haystack = text.to_uppercase();
        self.needles
            .iter()
            .position(|needle| !needle.is_empty() && haystack.contains(needle.as_str()))
            .map(|idx| &self.facilities[idx])
    }

    /// Number of facilities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    /// Whether no facilities were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }
}
