//! Configuration types for crawling and persistence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::batch::BOARD_GAME_LIST;

/// What to do on the next run with URLs that failed on this one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Re-fetch every failed URL on the next run.
    #[default]
    RetryAll,

    /// Carry status and extraction failures forward without re-fetching.
    /// Timeouts and transport errors are still retried.
    SkipPermanent,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::RetryAll => f.write_str("retry-all"),
            FailurePolicy::SkipPermanent => f.write_str("skip-permanent"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry-all" => Ok(FailurePolicy::RetryAll),
            "skip-permanent" => Ok(FailurePolicy::SkipPermanent),
            other => Err(format!(
                "unknown failure policy {other:?} (expected retry-all or skip-permanent)"
            )),
        }
    }
}

/// Configuration for a single partition worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Timeout for each detail page request. Default: 2s.
    pub request_timeout: Duration,

    /// Pause after every N processed URLs (skips included). Default: 50.
    pub pause_every: usize,

    /// How long to pause. Default: 1s.
    pub pause: Duration,

    /// Retry policy for previously failed URLs.
    pub failure_policy: FailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(2),
            pause_every: 50,
            pause: Duration::from_secs(1),
            failure_policy: FailurePolicy::RetryAll,
        }
    }
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pause cadence. An interval of 0 disables pausing.
    pub fn with_pause(mut self, every: usize, pause: Duration) -> Self {
        self.pause_every = every;
        self.pause = pause;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Whether the worker should pause after its `count`th URL.
    pub fn should_pause(&self, count: usize) -> bool {
        self.pause_every > 0 && count % self.pause_every == 0
    }
}

/// Configuration for the crawl coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Number of partitions to split the URL list into. Default: 3.
    pub partitions: usize,

    /// Per-worker settings.
    pub worker: WorkerConfig,

    /// Where the merged dataset is written. Default: `board_games.json`.
    pub output: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            partitions: 3,
            worker: WorkerConfig::default(),
            output: PathBuf::from("board_games.json"),
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.partitions = partitions;
        self
    }

    pub fn with_worker(mut self, worker: WorkerConfig) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }
}

/// Configuration for the batch persister.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Batch type written to every row. Default: `BOARD_GAME_LIST`.
    pub batch_type: String,

    /// Records per chunk write. Default: 100.
    pub chunk_size: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            batch_type: BOARD_GAME_LIST.to_string(),
            chunk_size: 100,
        }
    }
}

impl PersistConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_type(mut self, batch_type: impl Into<String>) -> Self {
        self.batch_type = batch_type.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let worker = WorkerConfig::default();
        assert_eq!(worker.request_timeout, Duration::from_secs(2));
        assert_eq!(worker.pause_every, 50);
        assert_eq!(worker.failure_policy, FailurePolicy::RetryAll);

        assert_eq!(CrawlConfig::default().partitions, 3);
        assert_eq!(CrawlConfig::default().output, PathBuf::from("board_games.json"));
        assert_eq!(PersistConfig::default().chunk_size, 100);
        assert_eq!(PersistConfig::default().batch_type, "BOARD_GAME_LIST");
    }

    #[test]
    fn test_should_pause() {
        let worker = WorkerConfig::new();
        assert!(!worker.should_pause(49));
        assert!(worker.should_pause(50));
        assert!(worker.should_pause(100));

        let never = WorkerConfig::new().with_pause(0, Duration::ZERO);
        assert!(!never.should_pause(50));
    }

    #[test]
    fn test_failure_policy_parses() {
        assert_eq!("retry-all".parse(), Ok(FailurePolicy::RetryAll));
        assert_eq!("skip-permanent".parse(), Ok(FailurePolicy::SkipPermanent));
        assert!("sometimes".parse::<FailurePolicy>().is_err());
    }
}
