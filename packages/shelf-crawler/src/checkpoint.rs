//! Per-partition checkpoints.
//!
//! A checkpoint is both a partition's output and its resume state:
//! `games_{pid}.json` maps url → [`GameRecord`] in insertion order, and
//! `fails_{pid}.json` lists the failures from the last run. A url present in
//! the game map is never fetched again.

use indexmap::IndexMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CheckpointError, CheckpointResult};
use crate::types::game::{FailureRecord, GameRecord};

/// In-memory state of one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checkpoint {
    pub games: IndexMap<String, GameRecord>,
    pub failures: Vec<FailureRecord>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `url` already succeeded.
    pub fn contains(&self, url: &str) -> bool {
        self.games.contains_key(url)
    }

    /// Record a success, keyed by its url.
    pub fn record_success(&mut self, game: GameRecord) {
        self.games.insert(game.url.clone(), game);
    }

    /// Append a failure. Failures are not deduplicated.
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.failures.push(failure);
    }

    /// Last recorded failure for `url`, if any.
    pub fn failure_for(&self, url: &str) -> Option<&FailureRecord> {
        self.failures.iter().rev().find(|f| f.url == url)
    }
}

/// Reads and writes checkpoint files in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn games_path(&self, partition: usize) -> PathBuf {
        self.dir.join(format!("games_{partition}.json"))
    }

    pub fn failures_path(&self, partition: usize) -> PathBuf {
        self.dir.join(format!("fails_{partition}.json"))
    }

    /// Load a partition's checkpoint. Missing files load as empty.
    pub async fn load(&self, partition: usize) -> CheckpointResult<Checkpoint> {
        let games = read_json(&self.games_path(partition)).await?.unwrap_or_default();
        let failures = read_json(&self.failures_path(partition)).await?.unwrap_or_default();
        Ok(Checkpoint { games, failures })
    }

    /// Overwrite a partition's checkpoint files.
    pub async fn save(&self, partition: usize, checkpoint: &Checkpoint) -> CheckpointResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CheckpointError::Io {
                path: self.dir.clone(),
                source,
            })?;

        write_json(&self.games_path(partition), &checkpoint.games).await?;
        write_json(&self.failures_path(partition), &checkpoint.failures).await?;
        debug!(
            partition,
            games = checkpoint.games.len(),
            failures = checkpoint.failures.len(),
            "Saved checkpoint"
        );
        Ok(())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CheckpointResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CheckpointError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| CheckpointError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Write through a temp file and rename, so a crash never leaves half a file.
async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> CheckpointResult<()> {
    let bytes = serde_json::to_vec(value).map_err(|source| CheckpointError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    let io_err = |source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    };
    tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}
