//! Command-line entry point for the shelf crawler.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelf_crawler::catalog::{load_latest, search};
use shelf_crawler::pipeline::read_artifact;
use shelf_crawler::stores::connect;
use shelf_crawler::{
    BatchPersister, BatchStore, CheckpointStore, CrawlConfig, CrawlCoordinator, FailurePolicy,
    GameRecord, HttpFetcher, PersistConfig, SiteConfig, SitemapLister, StoreConfig, WorkerConfig,
    BOARD_GAME_LIST,
};

#[derive(Parser)]
#[command(name = "shelf-crawler")]
#[command(about = "Crawl board game shelf locations and store them as batches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number of concurrent crawl partitions
    #[arg(long, global = true, default_value_t = 3)]
    partitions: usize,

    /// Directory holding per-partition checkpoints
    #[arg(long, global = true, default_value = ".")]
    checkpoint_dir: PathBuf,

    /// Combined JSON artifact
    #[arg(long, global = true, default_value = "board_games.json")]
    output: PathBuf,

    /// Timeout for each game page request, in milliseconds
    #[arg(long, global = true, default_value_t = 2000)]
    request_timeout_ms: u64,

    /// Whether earlier permanent failures are fetched again (retry-all, skip-permanent)
    #[arg(long, global = true, default_value_t = FailurePolicy::RetryAll)]
    failure_policy: FailurePolicy,

    /// Batch type written to and read from the store
    #[arg(long, global = true, default_value = BOARD_GAME_LIST)]
    batch_type: String,

    /// Records per chunk write
    #[arg(long, global = true, default_value_t = 100)]
    chunk_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the batch tables if missing
    Schema,

    /// Print every game URL from the sitemap
    List,

    /// Crawl all game pages and write the combined artifact
    Crawl,

    /// Write the combined artifact to the store as a new batch
    Persist,

    /// Crawl, then persist
    Run,

    /// Print the most recent completed batch
    Latest,

    /// Search the most recent completed batch by game name
    Search { term: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,shelf_crawler=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Schema => {
            let store = open_store().await?;
            store
                .ensure_schema()
                .await
                .context("Failed to create schema")?;
            tracing::info!("Schema ready");
        }
        Commands::List => {
            for url in list_urls().await? {
                println!("{url}");
            }
        }
        Commands::Crawl => {
            crawl(&cli).await?;
        }
        Commands::Persist => {
            let games = read_artifact(&cli.output)
                .await
                .context("Failed to read combined artifact")?;
            persist(&cli, &games).await?;
        }
        Commands::Run => {
            let games = crawl(&cli).await?;
            persist(&cli, &games).await?;
        }
        Commands::Latest => {
            for game in latest(&cli).await? {
                println!("{}\n", game.human_friendly());
            }
        }
        Commands::Search { term } => {
            let games = latest(&cli).await?;
            let hits = search(&games, term)?;
            if hits.is_empty() {
                println!("No games match {term:?}");
            }
            for game in hits {
                println!("{}\n", game.human_friendly());
            }
        }
    }

    Ok(())
}

async fn open_store() -> Result<Box<dyn BatchStore>> {
    let config = StoreConfig::from_env().context("Failed to load store configuration")?;
    connect(&config.credentials)
        .await
        .context("Failed to connect to batch store")
}

async fn list_urls() -> Result<Vec<String>> {
    let config = SiteConfig::from_env().context("Failed to load site configuration")?;
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let urls = SitemapLister::new(fetcher, config.games_list_url)
        .list_urls()
        .await
        .context("Failed to list game URLs")?;
    tracing::info!(urls = urls.len(), "Listed game URLs");
    Ok(urls)
}

async fn crawl(cli: &Cli) -> Result<Vec<GameRecord>> {
    let urls = list_urls().await?;

    let fetcher = Arc::new(HttpFetcher::new().context("Failed to build HTTP client")?);
    let worker = WorkerConfig::new()
        .with_request_timeout(Duration::from_millis(cli.request_timeout_ms))
        .with_failure_policy(cli.failure_policy);
    let config = CrawlConfig::new()
        .with_partitions(cli.partitions)
        .with_worker(worker)
        .with_output(cli.output.clone());
    let coordinator =
        CrawlCoordinator::new(fetcher, CheckpointStore::new(&cli.checkpoint_dir), config);

    let report = coordinator.crawl(&urls).await.context("Crawl failed")?;
    if !report.failed_partitions.is_empty() {
        tracing::warn!(partitions = ?report.failed_partitions, "Some partitions failed");
    }
    tracing::info!(
        games = report.games.len(),
        failures = report.failures(),
        "Crawl complete"
    );
    Ok(report.games)
}

async fn persist(cli: &Cli, games: &[GameRecord]) -> Result<()> {
    let store = open_store().await?;
    let config = PersistConfig::new()
        .with_batch_type(cli.batch_type.clone())
        .with_chunk_size(cli.chunk_size);

    let report = BatchPersister::new(store, config)
        .persist(games)
        .await
        .context("Failed to persist batch")?;
    tracing::info!(
        batch_id = report.batch_id,
        chunks = report.chunks,
        records = report.records,
        "Batch persisted"
    );
    Ok(())
}

async fn latest(cli: &Cli) -> Result<Vec<GameRecord>> {
    let store = open_store().await?;
    match load_latest(&*store, &cli.batch_type)
        .await
        .context("Failed to load latest batch")?
    {
        Some((batch, games)) => {
            tracing::info!(batch_id = batch.id, created_at = %batch.created_at, "Latest batch");
            Ok(games)
        }
        None => {
            tracing::warn!(batch_type = %cli.batch_type, "No completed batch found");
            Ok(Vec::new())
        }
    }
}
