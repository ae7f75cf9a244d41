//! The crawl-and-persist pipeline.
//!
//! - [`worker`] - One partition of detail pages, checkpointed
//! - [`coordinator`] - Splits URLs, runs workers concurrently, merges
//! - [`artifact`] - The combined JSON dataset on disk
//! - [`persist`] - Chunked batch writes to the store

pub mod artifact;
pub mod coordinator;
pub mod persist;
pub mod worker;

pub use artifact::{read_artifact, write_artifact};
pub use coordinator::{merge_partitions, split_partitions, CrawlCoordinator, CrawlReport};
pub use persist::{BatchPersister, PersistReport};
pub use worker::{PartitionReport, PartitionWorker};
