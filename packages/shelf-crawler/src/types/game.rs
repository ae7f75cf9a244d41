//! Game records and failure records.

use serde::{Deserialize, Serialize};

use crate::error::{CrawlError, FailureKind};

/// A shelf location for a game: which store, and where in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub store: String,
    pub locale: String,
}

impl Location {
    pub fn new(store: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            locale: locale.into(),
        }
    }

    pub fn human_friendly(&self) -> String {
        format!("{} - {}", self.store, self.locale)
    }
}

/// One successfully extracted game detail page.
///
/// Keyed by `url`. `raw` keeps the page's article markup so records can be
/// reprocessed without fetching again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub url: String,
    pub name: String,
    pub locations: Vec<Location>,
    pub raw: String,
}

impl GameRecord {
    /// Create a record with no locations and empty markup.
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            locations: Vec::new(),
            raw: String::new(),
        }
    }

    /// Add a location.
    pub fn with_location(mut self, store: impl Into<String>, locale: impl Into<String>) -> Self {
        self.locations.push(Location::new(store, locale));
        self
    }

    /// Set the raw article markup.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = raw.into();
        self
    }

    /// Name, one line per location, then the URL.
    pub fn human_friendly(&self) -> String {
        let locations = self
            .locations
            .iter()
            .map(Location::human_friendly)
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}\n{}", self.name, locations, self.url)
    }

    /// Case-insensitive substring match on the game name.
    pub fn name_matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
    }
}

/// A page that could not be turned into a [`GameRecord`] this run.
///
/// On disk this is the pair `[url, {"error": "...", "kind": "..."}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FailureEntry", into = "FailureEntry")]
pub struct FailureRecord {
    pub url: String,
    pub error: String,
    pub kind: Option<FailureKind>,
}

impl FailureRecord {
    pub fn new(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: error.into(),
            kind: None,
        }
    }

    /// Build a failure from the error that caused it.
    pub fn from_error(url: impl Into<String>, err: &CrawlError) -> Self {
        Self {
            url: url.into(),
            error: err.to_string(),
            kind: Some(err.kind()),
        }
    }

    /// Whether this failure should keep the URL out of later runs.
    pub fn is_permanent(&self) -> bool {
        self.kind.is_some_and(|k| k.is_permanent())
    }
}

#[derive(Serialize, Deserialize)]
struct FailureEntry(String, FailureDetail);

#[derive(Serialize, Deserialize)]
struct FailureDetail {
    error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
}

impl From<FailureEntry> for FailureRecord {
    fn from(FailureEntry(url, detail): FailureEntry) -> Self {
        Self {
            url,
            error: detail.error,
            kind: detail.kind,
        }
    }
}

impl From<FailureRecord> for FailureEntry {
    fn from(record: FailureRecord) -> Self {
        FailureEntry(
            record.url,
            FailureDetail {
                error: record.error,
                kind: record.kind,
            },
        )
    }
}
