//! Batch lifecycle rows and key/value rows in the remote store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Batch type used for the full board game list.
pub const BOARD_GAME_LIST: &str = "BOARD_GAME_LIST";

/// Lifecycle status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Pending,
    Done,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "PENDING",
            BatchStatus::Done => "DONE",
            BatchStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BatchStatus::Pending),
            "DONE" => Ok(BatchStatus::Done),
            "FAILED" => Ok(BatchStatus::Failed),
            other => Err(StoreError::Protocol(format!("unknown batch status: {other}"))),
        }
    }
}

/// One full run's worth of persisted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub batch_type: String,
    pub status: BatchStatus,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One record within a batch. `batch_id` + `key` identify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValueRow {
    pub batch_type: String,
    pub batch_id: i64,
    pub key: String,
    pub value: String,
}

/// Timestamp format used for `created_at` / `updated_at` columns.
///
/// Matches SQLite's `datetime('now')` so rows written by any backend sort the
/// same way.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a stored timestamp, accepting both the SQLite format and RFC 3339.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Protocol(format!("invalid timestamp {value:?}: {e}")))
}
