//! Typed errors for the shelf crawler.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! timed-out page apart from a page that will never parse.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from fetching or extracting a single page.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The request did not complete within its timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// The server answered with something other than 200
    #[error("failed to get {url}. Status code: {status}")]
    HttpStatus { url: String, status: u16 },

    /// Any other transport failure (DNS, connection reset, bad body)
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The page did not match the expected detail-page template
    #[error("extraction failed for {url}: missing {missing}")]
    Extraction { url: String, missing: String },
}

impl CrawlError {
    /// Timeouts are retry-worthy; everything else is recorded and moved past.
    pub fn is_timeout(&self) -> bool {
        matches!(self, CrawlError::Timeout { .. })
    }

    /// Classify this error for the failure list.
    pub fn kind(&self) -> FailureKind {
        match self {
            CrawlError::Timeout { .. } => FailureKind::Timeout,
            CrawlError::HttpStatus { .. } => FailureKind::HttpStatus,
            CrawlError::Http(_) => FailureKind::Http,
            CrawlError::Extraction { .. } => FailureKind::Extraction,
        }
    }
}

/// Coarse classification of a page failure, persisted next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    HttpStatus,
    Http,
    Extraction,
}

impl FailureKind {
    /// A permanent failure is one that re-fetching is unlikely to fix.
    pub fn is_permanent(&self) -> bool {
        matches!(self, FailureKind::HttpStatus | FailureKind::Extraction)
    }
}

/// Errors reading or writing a partition checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checkpoint at {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from a batch store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database driver or transport failed
    #[error("database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The remote answered, but not in the shape we expected
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A statement was rejected by the database
    #[error("statement failed: {0}")]
    Statement(String),

    /// Batch id does not exist
    #[error("batch not found: {0}")]
    BatchNotFound(i64),

    /// URL scheme has no backend compiled in
    #[error("unsupported store URL: {0}")]
    UnsupportedUrl(String),
}

/// Errors from the batch persister.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Opening or finalizing the batch row failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A chunk write failed; the batch stays PENDING
    #[error("chunk {chunk} of batch {batch_id} failed: {source}")]
    Chunk {
        batch_id: i64,
        chunk: usize,
        #[source]
        source: StoreError,
    },

    /// A record could not be serialized for storage
    #[error("failed to serialize {url}: {source}")]
    Serialize {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from searching the stored catalog.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search term must be at least {min} characters")]
    TermTooShort { min: usize },
}

/// Configuration errors, raised at startup before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Top-level error for pipeline entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Network failure while paginating the sitemap
    #[error("listing failed on sitemap page {page}: {source}")]
    Listing {
        page: u32,
        #[source]
        source: CrawlError,
    },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Search(#[from] SearchError),

    /// Stored or on-disk JSON could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for page fetch/extraction.
pub type CrawlResult<T> = std::result::Result<T, CrawlError>;

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for checkpoint operations.
pub type CheckpointResult<T> = std::result::Result<T, CheckpointError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let timeout = CrawlError::Timeout { url: "u".into() };
        let status = CrawlError::HttpStatus { url: "u".into(), status: 404 };
        let missing = CrawlError::Extraction { url: "u".into(), missing: "h1".into() };

        assert!(timeout.is_timeout());
        assert!(!status.is_timeout());
        assert!(!timeout.kind().is_permanent());
        assert!(status.kind().is_permanent());
        assert!(missing.kind().is_permanent());
        assert!(!FailureKind::Http.is_permanent());
    }

    #[test]
    fn test_status_message_names_url_and_code() {
        let err = CrawlError::HttpStatus {
            url: "https://site/games/a/".into(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "failed to get https://site/games/a/. Status code: 503"
        );
    }
}
