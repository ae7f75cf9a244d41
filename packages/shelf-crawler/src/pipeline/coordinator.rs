//! Crawl coordinator.
//!
//! Splits the URL list into contiguous partitions, runs one worker task per
//! partition, waits for all of them, then merges their checkpoints in
//! partition order and writes the combined artifact.

use futures::future::join_all;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::pipeline::artifact::write_artifact;
use crate::pipeline::worker::{PartitionReport, PartitionWorker};
use crate::traits::fetcher::Fetcher;
use crate::types::config::CrawlConfig;
use crate::types::game::GameRecord;

/// Outcome of a full crawl.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Reports from workers that finished, in partition order
    pub partitions: Vec<PartitionReport>,
    /// Partitions whose worker errored or panicked
    pub failed_partitions: Vec<usize>,
    /// Merged dataset
    #[serde(skip)]
    pub games: Vec<GameRecord>,
}

impl CrawlReport {
    pub fn failures(&self) -> usize {
        self.partitions.iter().map(PartitionReport::failures).sum()
    }
}

/// Split `urls` into at most `n` contiguous slices of `ceil(len / n)`.
///
/// The last slice may be shorter. An empty list gives no slices.
pub fn split_partitions(urls: &[String], n: usize) -> Vec<Vec<String>> {
    if urls.is_empty() {
        return Vec::new();
    }
    let size = urls.len().div_ceil(n.max(1));
    urls.chunks(size).map(<[String]>::to_vec).collect()
}

/// Merge per-partition maps in the order given.
///
/// A URL seen in more than one partition keeps its first position and takes
/// the later record.
pub fn merge_partitions(
    partitions: impl IntoIterator<Item = IndexMap<String, GameRecord>>,
) -> Vec<GameRecord> {
    let mut merged: IndexMap<String, GameRecord> = IndexMap::new();
    for games in partitions {
        merged.extend(games);
    }
    merged.into_values().collect()
}

/// Runs partition workers concurrently and merges their output.
pub struct CrawlCoordinator<F: Fetcher + 'static> {
    fetcher: Arc<F>,
    checkpoints: CheckpointStore,
    config: CrawlConfig,
}

impl<F: Fetcher + 'static> CrawlCoordinator<F> {
    pub fn new(fetcher: F, checkpoints: CheckpointStore, config: CrawlConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            checkpoints,
            config,
        }
    }

    /// Crawl every URL, write the merged dataset to the configured output and
    /// return it.
    ///
    /// A worker that fails does not stop the others; its partition is listed
    /// in [`CrawlReport::failed_partitions`] and whatever checkpoint it had
    /// from earlier runs is still merged.
    pub async fn crawl(&self, urls: &[String]) -> Result<CrawlReport> {
        let slices = split_partitions(urls, self.config.partitions);
        info!(
            urls = urls.len(),
            sizes = ?slices.iter().map(Vec::len).collect::<Vec<_>>(),
            "Split into partitions"
        );

        let handles = slices.iter().cloned().enumerate().map(|(pid, slice)| {
            let worker = PartitionWorker::new(
                pid,
                Arc::clone(&self.fetcher),
                self.checkpoints.clone(),
                self.config.worker.clone(),
            );
            tokio::spawn(async move { worker.run(&slice).await })
        });

        let mut report = CrawlReport::default();
        for (pid, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(Ok(partition)) => {
                    info!(partition = pid, "Worker finished");
                    report.partitions.push(partition);
                }
                Ok(Err(e)) => {
                    error!(partition = pid, error = %e, "Worker failed");
                    report.failed_partitions.push(pid);
                }
                Err(e) => {
                    error!(partition = pid, error = %e, "Worker panicked");
                    report.failed_partitions.push(pid);
                }
            }
        }
        info!("All workers finished");

        report.games = self.merge(slices.len(), &report.failed_partitions).await?;
        write_artifact(&self.config.output, &report.games).await?;
        info!(
            games = report.games.len(),
            failures = report.failures(),
            "Crawl merged"
        );
        Ok(report)
    }

    /// Merge the checkpoints of partitions `0..partitions`.
    ///
    /// An unreadable checkpoint of a partition in `failed` is skipped instead
    /// of aborting the merge.
    async fn merge(&self, partitions: usize, failed: &[usize]) -> Result<Vec<GameRecord>> {
        let mut maps = Vec::with_capacity(partitions);
        for pid in 0..partitions {
            match self.checkpoints.load(pid).await {
                Ok(checkpoint) => {
                    if checkpoint.games.is_empty() {
                        warn!(partition = pid, "No games to merge");
                    }
                    maps.push(checkpoint.games);
                }
                Err(e) if failed.contains(&pid) => {
                    warn!(partition = pid, error = %e, "Skipping unreadable checkpoint");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(merge_partitions(maps))
    }
}
