//! Batch persister.
//!
//! Writes one crawl's dataset as a batch: the schema is created if missing,
//! then a PENDING batch row, then the records in fixed-size chunks (each
//! chunk one atomic write), then DONE.
//! A failed chunk propagates and leaves the batch PENDING; there is no
//! resume from the last good chunk.

use serde::Serialize;
use tracing::info;

use crate::error::PersistError;
use crate::traits::store::BatchStore;
use crate::types::batch::{BatchStatus, KeyValueRow};
use crate::types::config::PersistConfig;
use crate::types::game::GameRecord;

/// Outcome of a successful persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistReport {
    pub batch_id: i64,
    pub chunks: usize,
    pub records: usize,
}

/// Persists a dataset into a [`BatchStore`].
pub struct BatchPersister<S: BatchStore> {
    store: S,
    config: PersistConfig,
}

impl<S: BatchStore> BatchPersister<S> {
    pub fn new(store: S, config: PersistConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Write `games` as a new batch and mark it DONE.
    pub async fn persist(&self, games: &[GameRecord]) -> Result<PersistReport, PersistError> {
        self.store.ensure_schema().await?;

        let batch_type = self.config.batch_type.as_str();
        let batch_id = self.store.open_batch(batch_type).await?;

        let chunks: Vec<&[GameRecord]> = games.chunks(self.config.chunk_size.max(1)).collect();
        info!(batch_id, chunks = chunks.len(), records = games.len(), "Split into chunks");

        for (index, chunk) in chunks.iter().enumerate() {
            let rows = to_rows(batch_type, batch_id, chunk)?;
            self.store
                .write_chunk(&rows)
                .await
                .map_err(|source| PersistError::Chunk {
                    batch_id,
                    chunk: index,
                    source,
                })?;
            info!(batch_id, chunk = index, games = chunk.len(), "Sent chunk");
        }

        self.store
            .set_batch_status(batch_id, BatchStatus::Done)
            .await?;
        info!(batch_id, "Batch done");

        Ok(PersistReport {
            batch_id,
            chunks: chunks.len(),
            records: games.len(),
        })
    }
}

/// One key/value row per record, keyed by url.
fn to_rows(
    batch_type: &str,
    batch_id: i64,
    games: &[GameRecord],
) -> Result<Vec<KeyValueRow>, PersistError> {
    games
        .iter()
        .map(|game| {
            let value = serde_json::to_string(game).map_err(|source| PersistError::Serialize {
                url: game.url.clone(),
                source,
            })?;
            Ok(KeyValueRow {
                batch_type: batch_type.to_string(),
                batch_id,
                key: game.url.clone(),
                value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::FailingStore;
    use proptest::prelude::*;

    fn games(n: usize) -> Vec<GameRecord> {
        (0..n)
            .map(|i| GameRecord::new(format!("https://site/games/g{i}/"), format!("Game {i}")))
            .collect()
    }

    #[tokio::test]
    async fn test_persist_marks_batch_done() {
        let persister = BatchPersister::new(MemoryStore::new(), PersistConfig::new());
        let report = persister.persist(&games(250)).await.unwrap();

        assert_eq!(report.chunks, 3);
        assert_eq!(report.records, 250);

        let store = persister.store();
        assert_eq!(store.chunk_sizes(), vec![100, 100, 50]);
        assert_eq!(store.status(report.batch_id), Some(BatchStatus::Done));

        let rows = store.rows(report.batch_id);
        assert_eq!(rows.len(), 250);
        assert_eq!(rows[0].key, "https://site/games/g0/");
        assert_eq!(rows[0].batch_type, "BOARD_GAME_LIST");
        let stored: GameRecord = serde_json::from_str(&rows[0].value).unwrap();
        assert_eq!(stored.name, "Game 0");
    }

    #[tokio::test]
    async fn test_empty_dataset_still_completes() {
        let persister = BatchPersister::new(MemoryStore::new(), PersistConfig::new());
        let report = persister.persist(&[]).await.unwrap();

        assert_eq!(report.chunks, 0);
        assert_eq!(persister.store().status(report.batch_id), Some(BatchStatus::Done));
    }

    #[tokio::test]
    async fn test_failed_chunk_leaves_batch_pending() {
        let store = FailingStore::new(MemoryStore::new(), 1);
        let persister = BatchPersister::new(store, PersistConfig::new().with_chunk_size(10));

        let err = persister.persist(&games(35)).await.unwrap_err();
        match err {
            PersistError::Chunk { batch_id, chunk, .. } => {
                assert_eq!(chunk, 1);
                let inner = persister.store().inner();
                assert_eq!(inner.status(batch_id), Some(BatchStatus::Pending));
                assert_eq!(inner.rows(batch_id).len(), 10);
            }
            other => panic!("expected chunk error, got {other:?}"),
        }
        assert_eq!(persister.store().chunk_calls(), 2);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_persist_creates_schema_on_fresh_database() {
        use crate::stores::SqliteStore;

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("fresh.db").display());
        let persister =
            BatchPersister::new(SqliteStore::new(&url).await.unwrap(), PersistConfig::new());

        let report = persister.persist(&games(3)).await.unwrap();

        let batch = persister
            .store()
            .latest_batch("BOARD_GAME_LIST", BatchStatus::Done)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.id, report.batch_id);
        assert_eq!(persister.store().batch_values(batch.id).await.unwrap().len(), 3);
    }

    proptest! {
        #[test]
        fn prop_chunk_count_and_sizes(size in 0usize..500, chunk in 1usize..150) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let persister = BatchPersister::new(
                MemoryStore::new(),
                PersistConfig::new().with_chunk_size(chunk),
            );
            let report = rt.block_on(persister.persist(&games(size))).unwrap();

            let sizes = persister.store().chunk_sizes();
            prop_assert_eq!(report.chunks, size.div_ceil(chunk));
            prop_assert_eq!(sizes.len(), size.div_ceil(chunk));
            prop_assert!(sizes.iter().all(|&s| s <= chunk && s > 0));
            prop_assert_eq!(sizes.iter().sum::<usize>(), size);
            if let Some((last, full)) = sizes.split_last() {
                prop_assert!(full.iter().all(|&s| s == chunk));
                prop_assert_eq!(*last, size - chunk * full.len());
            }
        }
    }
}
