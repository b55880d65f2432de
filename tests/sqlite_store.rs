//! End-to-end: orchestrated sync into the SQLite store, then search with
//! snippet extraction, then incremental re-sync.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use corpus_sync::adapter_design::{DesignFile, DesignToolClient};
use corpus_sync::config::{Config, DbConfig, ProjectConfig, RetrievalConfig, SyncConfig};
use corpus_sync::db;
use corpus_sync::fetch::PageFetcher;
use corpus_sync::migrate;
use corpus_sync::models::{Source, SourceKind, UploadItem};
use corpus_sync::orchestrator::{run_sync, SyncDeps};
use corpus_sync::search::search_corpus;
use corpus_sync::sqlite_store::{LocalProcessor, SqliteStore};
use corpus_sync::state::{NoopObserver, SyncContext};

struct UnusedDesignClient;

#[async_trait]
impl DesignToolClient for UnusedDesignClient {
    async fn list_files(&self, _project_domain: &str) -> Result<Vec<DesignFile>> {
        anyhow::bail!("not wired in this test")
    }

    async fn fetch_content(&self, _file_id: &str) -> Result<String> {
        anyhow::bail!("not wired in this test")
    }
}

struct UnusedFetcher;

#[async_trait]
impl PageFetcher for UnusedFetcher {
    async fn fetch(&self, _url: &str, _high_fidelity: bool) -> Option<String> {
        None
    }
}

fn config_with_items(db_path: &Path, items: Vec<UploadItem>) -> Config {
    Config {
        db: DbConfig {
            path: db_path.to_path_buf(),
        },
        sync: SyncConfig {
            concurrency: 5,
            include_globs: vec!["**".to_string()],
            exclude_globs: vec![],
            high_fidelity_renderer: false,
        },
        retrieval: RetrievalConfig {
            limit: 20,
            snippet_length: 80,
        },
        project: ProjectConfig {
            id: "default".to_string(),
        },
        sources: vec![Source {
            id: "upload1".to_string(),
            kind: SourceKind::ApiUpload { items },
        }],
    }
}

fn items_v1() -> Vec<UploadItem> {
    vec![
        UploadItem {
            path: "guides/alpha.md".to_string(),
            name: "alpha.md".to_string(),
            content: "# Getting Started\n\nThe quick brown fox jumps over the lazy dog."
                .to_string(),
        },
        UploadItem {
            path: "guides/beta.md".to_string(),
            name: "beta.md".to_string(),
            content: "Nothing relevant in this file at all.".to_string(),
        },
    ]
}

async fn sync_once(cfg: &Config) -> corpus_sync::orchestrator::SyncSummary {
    let pool = db::connect(&cfg.db.path).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();

    let store = Arc::new(SqliteStore::new(pool.clone()));
    for source in &cfg.sources {
        store.register_source(&cfg.project.id, source).await.unwrap();
    }

    let ctx = Arc::new(SyncContext::new(Arc::new(NoopObserver)));
    let deps = SyncDeps {
        processor: Arc::new(LocalProcessor::new(pool.clone(), cfg.project.id.clone())),
        checksums: store,
        design_client: Arc::new(UnusedDesignClient),
        fetcher: Arc::new(UnusedFetcher),
    };

    let summary = run_sync(cfg, &ctx, &deps).await.unwrap();
    pool.close().await;
    summary
}

#[tokio::test]
async fn sync_then_search_returns_snippets() {
    let dir = TempDir::new().unwrap();
    let cfg = config_with_items(&dir.path().join("corpus.db"), items_v1());

    let summary = sync_once(&cfg).await;
    assert!(summary.errors.is_empty(), "errors: {:?}", summary.errors);
    assert_eq!(summary.per_source[0].1.submitted, 2);

    let pool = db::connect(&cfg.db.path).await.unwrap();
    let store = SqliteStore::new(pool.clone());
    let results = search_corpus(&store, "fox", "default", 10, 80).await.unwrap();
    pool.close().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, "guides/alpha.md");
    assert_eq!(results[0].source_type, "api-upload");
    let snippet = &results[0].sections[0].content;
    assert!(snippet.contains("quick brown fox"), "snippet: {}", snippet);
    assert!(!snippet.contains('#'), "heading leaked into snippet");
}

#[tokio::test]
async fn resync_with_unchanged_content_submits_nothing() {
    let dir = TempDir::new().unwrap();
    let cfg = config_with_items(&dir.path().join("corpus.db"), items_v1());

    sync_once(&cfg).await;
    let second = sync_once(&cfg).await;

    assert_eq!(second.per_source[0].1.submitted, 0);
    assert_eq!(second.per_source[0].1.unchanged, 2);
}

#[tokio::test]
async fn changed_file_is_reindexed_and_old_sections_superseded() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");

    sync_once(&config_with_items(&db_path, items_v1())).await;

    let mut items = items_v1();
    items[0].content = "Completely rewritten guide about zebras instead.".to_string();
    let cfg = config_with_items(&db_path, items);
    let summary = sync_once(&cfg).await;

    assert_eq!(summary.per_source[0].1.submitted, 1);
    assert_eq!(summary.per_source[0].1.unchanged, 1);

    let pool = db::connect(&db_path).await.unwrap();
    let store = SqliteStore::new(pool.clone());
    let zebras = search_corpus(&store, "zebras", "default", 10, 80).await.unwrap();
    let fox = search_corpus(&store, "fox", "default", 10, 80).await.unwrap();
    pool.close().await;

    assert_eq!(zebras.len(), 1);
    assert_eq!(zebras[0].path, "guides/alpha.md");
    assert!(fox.is_empty(), "stale sections still searchable");
}

#[tokio::test]
async fn emptied_file_is_reindexed_and_old_sections_superseded() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("corpus.db");

    sync_once(&config_with_items(&db_path, items_v1())).await;

    // The file's content became empty upstream. The re-sync must still
    // submit it so its previously indexed sections stop matching.
    let mut items = items_v1();
    items[0].content = String::new();
    let cfg = config_with_items(&db_path, items);
    let summary = sync_once(&cfg).await;

    assert_eq!(summary.per_source[0].1.submitted, 1);
    assert_eq!(summary.per_source[0].1.unchanged, 1);

    let pool = db::connect(&db_path).await.unwrap();
    let store = SqliteStore::new(pool.clone());
    let fox = search_corpus(&store, "fox", "default", 10, 80).await.unwrap();
    pool.close().await;

    assert!(fox.is_empty(), "stale sections still searchable");
}
