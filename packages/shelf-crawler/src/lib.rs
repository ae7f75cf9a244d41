//! Board Game Shelf Crawler
//!
//! Crawls the board-game catalog of one site, records which store and shelf
//! each game sits on, and persists the result as a batch in a libSQL database.
//!
//! # Pipeline
//!
//! 1. [`sitemap`] walks paginated XML sitemaps until the first page that does
//!    not parse.
//! 2. [`pipeline::CrawlCoordinator`] splits the URLs into partitions and runs
//!    one worker task per partition. Each worker extracts pages with
//!    [`extract::PageExtractor`] and checkpoints its progress, so an
//!    interrupted crawl resumes where it stopped.
//! 3. Checkpoints are merged in partition order into one JSON artifact.
//! 4. [`pipeline::BatchPersister`] writes the artifact to a [`BatchStore`] in
//!    chunks and marks the batch DONE.
//!
//! # Usage
//!
//! ```rust,ignore
//! use shelf_crawler::{CheckpointStore, CrawlConfig, CrawlCoordinator, HttpFetcher, SitemapLister};
//!
//! let urls = SitemapLister::new(HttpFetcher::new()?, &config.games_list_url)
//!     .list_urls()
//!     .await?;
//!
//! let coordinator = CrawlCoordinator::new(
//!     HttpFetcher::new()?,
//!     CheckpointStore::new("."),
//!     CrawlConfig::new(),
//! );
//! let report = coordinator.crawl(&urls).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (Fetcher, BatchStore)
//! - [`types`] - Game records, batches and run configuration
//! - [`pipeline`] - Workers, coordinator, artifact and persister
//! - [`stores`] - Storage implementations (LibsqlStore, MemoryStore, etc.)
//! - [`fetchers`] - Fetcher implementations (HttpFetcher)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod catalog;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetchers;
pub mod pipeline;
pub mod security;
pub mod sitemap;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::{SiteConfig, StoreConfig};
pub use error::{
    CheckpointError, ConfigError, CrawlError, Error, FailureKind, PersistError, Result,
    SearchError, StoreError,
};
pub use extract::PageExtractor;
pub use fetchers::HttpFetcher;
pub use pipeline::{BatchPersister, CrawlCoordinator, CrawlReport, PartitionWorker};
pub use security::credentials::{SecretString, StoreCredentials};
pub use sitemap::SitemapLister;
pub use stores::{LibsqlStore, MemoryStore};
pub use traits::{
    fetcher::{FetchedPage, Fetcher},
    store::BatchStore,
};
pub use types::{
    batch::{Batch, BatchStatus, KeyValueRow, BOARD_GAME_LIST},
    config::{CrawlConfig, FailurePolicy, PersistConfig, WorkerConfig},
    game::{FailureRecord, GameRecord, Location},
};
