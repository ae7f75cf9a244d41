//! Storage trait for batches and their key/value rows.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::batch::{Batch, BatchStatus, KeyValueRow};

/// Remote store holding batch lifecycle rows and per-record rows.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Create the `batch` and `key_value` tables and indexes if missing.
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// Insert a PENDING batch row and return its id.
    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64>;

    /// Insert all rows in one atomic write. Either every row lands or none do.
    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()>;

    /// Update a batch's status and `updated_at`.
    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()>;

    /// Most recent batch (highest id) of a type with the given status.
    async fn latest_batch(&self, batch_type: &str, status: BatchStatus)
        -> StoreResult<Option<Batch>>;

    /// All stored values of a batch, in insertion order.
    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>>;
}

#[async_trait]
impl<S: BatchStore + ?Sized> BatchStore for Box<S> {
    async fn ensure_schema(&self) -> StoreResult<()> {
        (**self).ensure_schema().await
    }

    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64> {
        (**self).open_batch(batch_type).await
    }

    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()> {
        (**self).write_chunk(rows).await
    }

    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()> {
        (**self).set_batch_status(batch_id, status).await
    }

    async fn latest_batch(
        &self,
        batch_type: &str,
        status: BatchStatus,
    ) -> StoreResult<Option<Batch>> {
        (**self).latest_batch(batch_type, status).await
    }

    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>> {
        (**self).batch_values(batch_id).await
    }
}

/// DDL shared by the SQL backends. Statements are idempotent.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS key_value (id INTEGER PRIMARY KEY, batch_type TEXT, batch_id INTEGER, key TEXT, value JSONB)",
    "CREATE INDEX IF NOT EXISTS key_index ON key_value (batch_type, batch_id, key)",
    "CREATE TABLE IF NOT EXISTS batch (id INTEGER PRIMARY KEY, batch_type TEXT, status TEXT, details JSONB, created_at TIMESTAMP, updated_at TIMESTAMP)",
    "CREATE INDEX IF NOT EXISTS batch_type_index ON batch (batch_type, id)",
];

pub const INSERT_BATCH: &str = "INSERT INTO batch (batch_type, status, created_at, updated_at) VALUES (?1, ?2, datetime('now'), datetime('now')) RETURNING id";

pub const INSERT_KEY_VALUE: &str =
    "INSERT INTO key_value (batch_type, batch_id, key, value) VALUES (?1, ?2, ?3, ?4)";

pub const UPDATE_BATCH_STATUS: &str =
    "UPDATE batch SET status = ?1, updated_at = datetime('now') WHERE id = ?2";

pub const SELECT_LATEST_BATCH: &str = "SELECT id, batch_type, status, details, created_at, updated_at FROM batch WHERE batch_type = ?1 AND status = ?2 ORDER BY id DESC LIMIT 1";

pub const SELECT_BATCH_VALUES: &str = "SELECT value FROM key_value WHERE batch_id = ?1 ORDER BY id";
