//! Partition worker.
//!
//! Processes one slice of the URL list in order, skipping URLs its checkpoint
//! already holds, and overwrites the checkpoint once the slice is done.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::CheckpointResult;
use crate::extract::PageExtractor;
use crate::traits::fetcher::Fetcher;
use crate::types::config::{FailurePolicy, WorkerConfig};
use crate::types::game::FailureRecord;

/// Counts from one worker run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionReport {
    pub partition: usize,
    /// URLs in the slice
    pub total: usize,
    /// Already in the checkpoint when the run started
    pub loaded: usize,
    /// Skipped because they were already checkpointed
    pub skipped: usize,
    /// Newly extracted this run
    pub succeeded: usize,
    /// Timed out this run
    pub timeouts: usize,
    /// Failed for any other reason this run
    pub failed: usize,
    /// Permanent failures carried over without fetching
    pub carried: usize,
}

impl PartitionReport {
    /// Failures written to the failure list.
    pub fn failures(&self) -> usize {
        self.timeouts + self.failed + self.carried
    }
}

/// Runs the page extractor over one partition of URLs.
pub struct PartitionWorker<F: Fetcher> {
    partition: usize,
    extractor: PageExtractor<F>,
    checkpoints: CheckpointStore,
    config: WorkerConfig,
}

impl<F: Fetcher> PartitionWorker<F> {
    pub fn new(
        partition: usize,
        fetcher: F,
        checkpoints: CheckpointStore,
        config: WorkerConfig,
    ) -> Self {
        let extractor = PageExtractor::new(fetcher).with_timeout(config.request_timeout);
        Self {
            partition,
            extractor,
            checkpoints,
            config,
        }
    }

    /// Process `urls` to completion and persist the checkpoint.
    ///
    /// Page failures are recorded and never abort the run. Only checkpoint
    /// I/O errors are returned.
    pub async fn run(&self, urls: &[String]) -> CheckpointResult<PartitionReport> {
        let pid = self.partition;
        let prior = self.checkpoints.load(pid).await?;

        if prior.games.is_empty() {
            info!(partition = pid, "No checkpoint found, starting from scratch");
        } else {
            info!(partition = pid, games = prior.games.len(), "Loaded checkpoint");
        }

        let mut report = PartitionReport {
            partition: pid,
            total: urls.len(),
            loaded: prior.games.len(),
            ..Default::default()
        };
        let mut state = Checkpoint {
            games: prior.games.clone(),
            failures: Vec::new(),
        };

        for (index, url) in urls.iter().enumerate() {
            let count = index + 1;

            if self.config.should_pause(count) {
                info!(
                    partition = pid,
                    count,
                    failed = state.failures.len(),
                    "Taking a break"
                );
                tokio::time::sleep(self.config.pause).await;
            }

            if state.contains(url) {
                report.skipped += 1;
                if self.config.should_pause(count) {
                    debug!(partition = pid, count, url = %url, "Skipping");
                }
                continue;
            }

            if self.config.failure_policy == FailurePolicy::SkipPermanent {
                if let Some(previous) = prior.failure_for(url).filter(|f| f.is_permanent()) {
                    debug!(partition = pid, url = %url, "Skipping permanent failure");
                    state.record_failure(previous.clone());
                    report.carried += 1;
                    continue;
                }
            }

            match self.extractor.extract(url).await {
                Ok(game) => {
                    info!(partition = pid, count, name = %game.name, "Processed");
                    state.record_success(game);
                    report.succeeded += 1;
                }
                Err(e) if e.is_timeout() => {
                    warn!(partition = pid, count, game = slug(url), "Timeout, retrying later");
                    state.record_failure(FailureRecord::from_error(url, &e));
                    report.timeouts += 1;
                }
                Err(e) => {
                    warn!(partition = pid, count, game = slug(url), error = %e, "Failed");
                    state.record_failure(FailureRecord::from_error(url, &e));
                    report.failed += 1;
                }
            }
        }

        info!(
            partition = pid,
            processed = urls.len(),
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failures(),
            "Partition finished"
        );

        self.checkpoints.save(pid, &state).await?;
        Ok(report)
    }
}

/// Last path segment of a game URL, for compact log lines.
fn slug(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{game_page, MockFetcher};
    use std::time::Duration;

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| format!("https://site/games/{n}/")).collect()
    }

    fn quick() -> WorkerConfig {
        WorkerConfig::new().with_pause(50, Duration::ZERO)
    }

    fn fetcher_for(names: &[&str]) -> MockFetcher {
        names.iter().fold(MockFetcher::new(), |f, n| {
            f.with_body(
                format!("https://site/games/{n}/"),
                game_page(n, &[("Vesterbro", "A1")]),
            )
        })
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("https://site/games/7-wonders-duel/"), "7-wonders-duel");
        assert_eq!(slug("https://site/games/azul"), "azul");
    }

    #[tokio::test]
    async fn test_records_successes_and_failures() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let fetcher = fetcher_for(&["a", "c"])
            .with_timeout("https://site/games/b/")
            .with_status("https://site/games/d/", 404, "");

        let worker = PartitionWorker::new(0, fetcher, checkpoints.clone(), quick());
        let report = worker.run(&urls(&["a", "b", "c", "d"])).await.unwrap();

        assert_eq!(report.succeeded, 2);
        assert_eq!(report.timeouts, 1);
        assert_eq!(report.failed, 1);

        let saved = checkpoints.load(0).await.unwrap();
        assert_eq!(
            saved.games.keys().cloned().collect::<Vec<_>>(),
            urls(&["a", "c"])
        );
        assert_eq!(
            saved.failures.iter().map(|f| f.url.clone()).collect::<Vec<_>>(),
            urls(&["b", "d"])
        );
    }

    #[tokio::test]
    async fn test_second_run_skips_checkpointed_urls() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let fetcher = fetcher_for(&["a", "b"]).with_timeout("https://site/games/c/");
        let slice = urls(&["a", "b", "c"]);

        let worker = PartitionWorker::new(3, fetcher.clone(), checkpoints.clone(), quick());
        worker.run(&slice).await.unwrap();
        fetcher.clear_calls();

        fetcher.set_body("https://site/games/c/", game_page("c", &[]));
        let report = worker.run(&slice).await.unwrap();

        assert_eq!(fetcher.calls(), vec!["https://site/games/c/"]);
        assert_eq!(report.loaded, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.succeeded, 1);

        let saved = checkpoints.load(3).await.unwrap();
        assert_eq!(saved.games.len(), 3);
        assert!(saved.failures.is_empty());
    }

    #[tokio::test]
    async fn test_retry_all_refetches_permanent_failures() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let fetcher = MockFetcher::new().with_status("https://site/games/a/", 500, "");
        let slice = urls(&["a"]);

        let worker = PartitionWorker::new(0, fetcher.clone(), checkpoints, quick());
        worker.run(&slice).await.unwrap();
        worker.run(&slice).await.unwrap();

        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_skip_permanent_carries_failures_forward() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let fetcher = MockFetcher::new()
            .with_status("https://site/games/gone/", 404, "")
            .with_timeout("https://site/games/slow/");
        let slice = urls(&["gone", "slow"]);
        let config = quick().with_failure_policy(FailurePolicy::SkipPermanent);

        let worker = PartitionWorker::new(0, fetcher.clone(), checkpoints.clone(), config);
        worker.run(&slice).await.unwrap();
        fetcher.clear_calls();

        let report = worker.run(&slice).await.unwrap();
        assert_eq!(fetcher.calls(), vec!["https://site/games/slow/"]);
        assert_eq!(report.carried, 1);
        assert_eq!(report.timeouts, 1);

        let saved = checkpoints.load(0).await.unwrap();
        assert_eq!(saved.failures.len(), 2);
        assert_eq!(saved.failures[0].url, "https://site/games/gone/");
    }

    #[tokio::test]
    async fn test_request_timeout_is_passed_to_fetcher() {
        let dir = tempfile::tempdir().unwrap();
        let config = quick().with_request_timeout(Duration::from_millis(500));
        let fetcher = fetcher_for(&["a"]);

        let checkpoints = CheckpointStore::new(dir.path());
        let worker = PartitionWorker::new(0, fetcher.clone(), checkpoints, config);
        worker.run(&urls(&["a"])).await.unwrap();

        assert_eq!(fetcher.timeouts(), vec![Some(Duration::from_millis(500))]);
    }

    #[tokio::test]
    async fn test_skip_permanent_retries_transport_errors() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let fetcher = MockFetcher::new()
            .with_transport_error("https://site/games/flaky/", "connection reset");
        let slice = urls(&["flaky"]);
        let config = quick().with_failure_policy(FailurePolicy::SkipPermanent);

        let worker = PartitionWorker::new(0, fetcher.clone(), checkpoints.clone(), config);
        let first = worker.run(&slice).await.unwrap();
        assert_eq!(first.failed, 1);

        let saved = checkpoints.load(0).await.unwrap();
        assert_eq!(saved.failures[0].kind, Some(crate::error::FailureKind::Http));
        assert!(!saved.failures[0].is_permanent());

        fetcher.clear_calls();
        let second = worker.run(&slice).await.unwrap();

        assert_eq!(fetcher.calls(), vec!["https://site/games/flaky/"]);
        assert_eq!(second.failed, 1);
        assert_eq!(second.carried, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_every_interval_including_skips() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoints = CheckpointStore::new(dir.path());
        let names: Vec<String> = (0..5).map(|i| format!("g{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let slice = urls(&name_refs);

        let mut prior = Checkpoint::new();
        prior.record_success(crate::types::game::GameRecord::new(&slice[0], "g0"));
        prior.record_success(crate::types::game::GameRecord::new(&slice[1], "g1"));
        checkpoints.save(0, &prior).await.unwrap();

        let config = WorkerConfig::new().with_pause(2, Duration::from_secs(1));
        let worker = PartitionWorker::new(0, fetcher_for(&name_refs), checkpoints, config);

        let start = tokio::time::Instant::now();
        worker.run(&slice).await.unwrap();

        // pauses before items 2 and 4; item 2 is a skip
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "paused {elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "paused {elapsed:?}");
    }
}
