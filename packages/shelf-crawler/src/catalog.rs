//! Reading persisted batches back as a game catalog.

use tracing::info;

use crate::error::{Result, SearchError};
use crate::traits::store::BatchStore;
use crate::types::batch::{Batch, BatchStatus};
use crate::types::game::GameRecord;

/// Shortest accepted search term, after trimming.
pub const MIN_TERM_LEN: usize = 3;

/// Load the most recent DONE batch of `batch_type` and decode its records.
///
/// Returns `None` if no batch of that type has completed yet.
pub async fn load_latest<S: BatchStore + ?Sized>(
    store: &S,
    batch_type: &str,
) -> Result<Option<(Batch, Vec<GameRecord>)>> {
    let Some(batch) = store.latest_batch(batch_type, BatchStatus::Done).await? else {
        info!(batch_type, "No completed batch");
        return Ok(None);
    };

    let games = store
        .batch_values(batch.id)
        .await?
        .iter()
        .map(|value| serde_json::from_str::<GameRecord>(value))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!(batch_id = batch.id, games = games.len(), "Loaded batch");
    Ok(Some((batch, games)))
}

/// Games whose name contains `term`, ignoring case.
pub fn search<'a>(
    games: &'a [GameRecord],
    term: &str,
) -> std::result::Result<Vec<&'a GameRecord>, SearchError> {
    let term = term.trim();
    if term.chars().count() < MIN_TERM_LEN {
        return Err(SearchError::TermTooShort { min: MIN_TERM_LEN });
    }
    Ok(games.iter().filter(|g| g.name_matches(term)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::persist::BatchPersister;
    use crate::stores::MemoryStore;
    use crate::types::config::PersistConfig;

    fn shelf() -> Vec<GameRecord> {
        vec![
            GameRecord::new("https://site/games/azul/", "Azul").with_location("Vesterbro", "B3"),
            GameRecord::new("https://site/games/catan/", "Catan"),
            GameRecord::new("https://site/games/azul-summer/", "Azul: Summer Pavilion"),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let games = shelf();
        let hits = search(&games, "  AZU ").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "Azul");
    }

    #[test]
    fn test_short_term_rejected() {
        let games = shelf();
        assert!(matches!(
            search(&games, " az "),
            Err(SearchError::TermTooShort { min: 3 })
        ));
    }

    #[tokio::test]
    async fn test_load_latest_decodes_done_batch() {
        let persister = BatchPersister::new(MemoryStore::new(), PersistConfig::new());
        persister.persist(&shelf()[..1]).await.unwrap();
        let report = persister.persist(&shelf()).await.unwrap();

        let (batch, games) = load_latest(persister.store(), "BOARD_GAME_LIST")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(batch.id, report.batch_id);
        assert_eq!(games, shelf());
    }

    #[tokio::test]
    async fn test_load_latest_ignores_pending() {
        let store = MemoryStore::new();
        store.open_batch("BOARD_GAME_LIST").await.unwrap();
        assert!(load_latest(&store, "BOARD_GAME_LIST").await.unwrap().is_none());
    }
}
