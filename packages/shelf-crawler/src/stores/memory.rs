//! In-memory batch store for testing and dry runs.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::BatchStore;
use crate::types::batch::{Batch, BatchStatus, KeyValueRow};

/// In-memory storage for batches and rows.
///
/// Not suitable for production as data is lost on exit.
#[derive(Default)]
pub struct MemoryStore {
    batches: RwLock<Vec<Batch>>,
    rows: RwLock<Vec<KeyValueRow>>,
    chunk_sizes: RwLock<Vec<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status of a batch.
    pub fn status(&self, batch_id: i64) -> Option<BatchStatus> {
        self.batches
            .read()
            .unwrap()
            .iter()
            .find(|b| b.id == batch_id)
            .map(|b| b.status)
    }

    /// Rows of a batch in insertion order.
    pub fn rows(&self, batch_id: i64) -> Vec<KeyValueRow> {
        self.rows
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect()
    }

    /// Size of every committed chunk, in write order.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes.read().unwrap().clone()
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn open_batch(&self, batch_type: &str) -> StoreResult<i64> {
        let mut batches = self.batches.write().unwrap();
        let id = batches.len() as i64 + 1;
        let now = Utc::now();
        batches.push(Batch {
            id,
            batch_type: batch_type.to_string(),
            status: BatchStatus::Pending,
            details: None,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn write_chunk(&self, rows: &[KeyValueRow]) -> StoreResult<()> {
        self.rows.write().unwrap().extend_from_slice(rows);
        self.chunk_sizes.write().unwrap().push(rows.len());
        Ok(())
    }

    async fn set_batch_status(&self, batch_id: i64, status: BatchStatus) -> StoreResult<()> {
        let mut batches = self.batches.write().unwrap();
        let batch = batches
            .iter_mut()
            .find(|b| b.id == batch_id)
            .ok_or(StoreError::BatchNotFound(batch_id))?;
        batch.status = status;
        batch.updated_at = Utc::now();
        Ok(())
    }

    async fn latest_batch(
        &self,
        batch_type: &str,
        status: BatchStatus,
    ) -> StoreResult<Option<Batch>> {
        Ok(self
            .batches
            .read()
            .unwrap()
            .iter()
            .filter(|b| b.batch_type == batch_type && b.status == status)
            .max_by_key(|b| b.id)
            .cloned())
    }

    async fn batch_values(&self, batch_id: i64) -> StoreResult<Vec<String>> {
        Ok(self.rows(batch_id).into_iter().map(|r| r.value).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(batch_id: i64, key: &str) -> KeyValueRow {
        KeyValueRow {
            batch_type: "TEST".into(),
            batch_id,
            key: key.into(),
            value: format!("{{\"url\":\"{key}\"}}"),
        }
    }

    #[tokio::test]
    async fn test_latest_batch_filters_by_status_and_type() {
        let store = MemoryStore::new();
        let first = store.open_batch("TEST").await.unwrap();
        let second = store.open_batch("TEST").await.unwrap();
        let other = store.open_batch("OTHER").await.unwrap();

        store.set_batch_status(first, BatchStatus::Done).await.unwrap();
        store.set_batch_status(other, BatchStatus::Done).await.unwrap();

        let latest = store.latest_batch("TEST", BatchStatus::Done).await.unwrap().unwrap();
        assert_eq!(latest.id, first);

        store.set_batch_status(second, BatchStatus::Done).await.unwrap();
        let latest = store.latest_batch("TEST", BatchStatus::Done).await.unwrap().unwrap();
        assert_eq!(latest.id, second);

        assert!(store.latest_batch("NONE", BatchStatus::Done).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_values_in_order() {
        let store = MemoryStore::new();
        let id = store.open_batch("TEST").await.unwrap();
        store.write_chunk(&[row(id, "a"), row(id, "b")]).await.unwrap();
        store.write_chunk(&[row(id, "c")]).await.unwrap();

        let values = store.batch_values(id).await.unwrap();
        assert_eq!(values.len(), 3);
        assert!(values[2].contains("\"c\""));
        assert_eq!(store.chunk_sizes(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_unknown_batch_status_update() {
        let store = MemoryStore::new();
        let err = store.set_batch_status(42, BatchStatus::Done).await.unwrap_err();
        assert!(matches!(err, StoreError::BatchNotFound(42)));
    }
}
