//! # Corpus Sync CLI (`corpus`)
//!
//! The `corpus` binary drives the ingestion pipeline and the search index
//! from the command line.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpus init` | Create the SQLite database and run schema migrations |
//! | `corpus sources` | List configured sources |
//! | `corpus sync [source]` | Sync configured sources into the index |
//! | `corpus search "<query>"` | Search indexed files |
//!
//! ## Examples
//!
//! ```bash
//! corpus init --config ./corpus.toml
//! corpus sync --config ./corpus.toml
//! corpus search "authentication flow" --limit 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use corpus_sync::adapter_design::HttpDesignClient;
use corpus_sync::config::{self, Config};
use corpus_sync::db;
use corpus_sync::fetch::HttpFetcher;
use corpus_sync::migrate;
use corpus_sync::orchestrator::{run_sync, SyncDeps};
use corpus_sync::search::search_corpus;
use corpus_sync::sqlite_store::{LocalProcessor, SqliteStore};
use corpus_sync::state::{StderrObserver, SyncContext};

/// Corpus Sync: incremental multi-source ingestion and full-text search
/// for documentation corpora.
#[derive(Parser)]
#[command(
    name = "corpus",
    about = "Incremental multi-source ingestion and full-text search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./corpus.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Idempotent.
    Init,

    /// List configured sources.
    Sources,

    /// Sync configured sources into the index.
    ///
    /// Incremental: files whose checksum matches the previous sync are
    /// skipped. Ctrl-C requests cooperative cancellation; in-flight files
    /// finish, pending ones do not start.
    Sync {
        /// Sync only the source with this id (default: all sources).
        source: Option<String>,

        /// Override the configured submission pool width.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Search indexed files.
    ///
    /// Prints one block per matching file with its snippets in rank order.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of section matches to return (capped at 20).
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Sources => {
            list_sources(&cfg);
        }
        Commands::Sync { source, concurrency } => {
            cmd_sync(&cfg, source.as_deref(), concurrency).await?;
        }
        Commands::Search { query, limit } => {
            cmd_search(&cfg, &query, limit).await?;
        }
    }

    Ok(())
}

fn list_sources(cfg: &Config) {
    if cfg.sources.is_empty() {
        println!("No sources configured.");
        return;
    }
    for source in &cfg.sources {
        println!("{}  [{}]", source.id, source.kind.label());
    }
}

async fn cmd_sync(
    cfg: &Config,
    only_source: Option<&str>,
    concurrency: Option<usize>,
) -> anyhow::Result<()> {
    let mut cfg = cfg.clone();
    if let Some(id) = only_source {
        cfg.sources.retain(|s| s.id == id);
        if cfg.sources.is_empty() {
            anyhow::bail!("no source named '{id}' in the configuration");
        }
    }
    if let Some(width) = concurrency {
        if width == 0 {
            anyhow::bail!("--concurrency must be at least 1");
        }
        cfg.sync.concurrency = width;
    }
    let cfg = &cfg;

    let pool = db::connect(&cfg.db.path).await?;
    migrate::run_migrations(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    for source in &cfg.sources {
        store.register_source(&cfg.project.id, source).await?;
    }

    let ctx = Arc::new(SyncContext::new(Arc::new(StderrObserver)));

    // Ctrl-C requests cooperative cancellation.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctx.request_cancel();
            }
        });
    }

    let deps = SyncDeps {
        processor: Arc::new(LocalProcessor::new(pool.clone(), cfg.project.id.clone())),
        checksums: store,
        design_client: Arc::new(HttpDesignClient::new()?),
        fetcher: Arc::new(HttpFetcher::new()?),
    };

    let summary = run_sync(cfg, &ctx, &deps).await?;
    print!("{}", summary.render());

    pool.close().await;
    Ok(())
}

async fn cmd_search(cfg: &Config, query: &str, limit: Option<i64>) -> anyhow::Result<()> {
    let pool = db::connect(&cfg.db.path).await?;
    let store = SqliteStore::new(pool.clone());

    let limit = limit.unwrap_or(cfg.retrieval.limit);
    let results = search_corpus(
        &store,
        query,
        &cfg.project.id,
        limit,
        cfg.retrieval.snippet_length,
    )
    .await?;

    if results.is_empty() {
        println!("No results.");
    } else {
        for result in &results {
            println!("{}  [{}]  score {:.3}", result.path, result.source_type, result.score);
            for section in &result.sections {
                println!("  {}", section.content);
            }
            println!();
        }
    }

    pool.close().await;
    Ok(())
}
