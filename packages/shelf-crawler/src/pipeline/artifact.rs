//! The combined crawl artifact: a JSON array of game records.

use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::game::GameRecord;

/// Write the merged dataset to `path`, replacing any previous artifact.
pub async fn write_artifact(path: &Path, games: &[GameRecord]) -> Result<()> {
    let bytes = serde_json::to_vec(games)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| Error::Io {
                path: parent.to_path_buf(),
                source,
            })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), games = games.len(), "Wrote combined artifact");
    Ok(())
}

/// Read a combined artifact back.
pub async fn read_artifact(path: &Path) -> Result<Vec<GameRecord>> {
    let bytes = tokio::fs::read(path).await.map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let games: Vec<GameRecord> = serde_json::from_slice(&bytes)?;
    info!(path = %path.display(), games = games.len(), "Loaded combined artifact");
    Ok(games)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_artifact_is_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("board_games.json");
        let games = vec![
            GameRecord::new("https://site/games/a/", "Azul").with_location("Vesterbro", "B3"),
            GameRecord::new("https://site/games/b/", "Brass"),
        ];

        write_artifact(&path, &games).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["url"], "https://site/games/a/");
        assert_eq!(json[1]["name"], "Brass");

        assert_eq!(read_artifact(&path).await.unwrap(), games);
    }

    #[tokio::test]
    async fn test_missing_artifact_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let err = read_artifact(&path).await.unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }
}
