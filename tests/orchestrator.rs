//! Orchestrator behavior: source-level failure isolation, quota halt
//! across sources, state returning to idle.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use corpus_sync::adapter_design::{DesignFile, DesignToolClient};
use corpus_sync::config::{Config, DbConfig, ProjectConfig, RetrievalConfig, SyncConfig};
use corpus_sync::error::SubmitError;
use corpus_sync::fetch::PageFetcher;
use corpus_sync::models::{FileChecksum, Source, SourceKind, UploadItem};
use corpus_sync::orchestrator::{run_sync, SyncDeps};
use corpus_sync::processor::{EmbeddingProcessor, SubmittedFile};
use corpus_sync::state::{NoopObserver, SyncContext, TrainingState};
use corpus_sync::store::ChecksumStore;

struct EmptyChecksums;

#[async_trait]
impl ChecksumStore for EmptyChecksums {
    async fn load_checksums(&self, _source_id: &str) -> Result<Vec<FileChecksum>> {
        Ok(Vec::new())
    }
}

struct FailingDesignClient;

#[async_trait]
impl DesignToolClient for FailingDesignClient {
    async fn list_files(&self, project_domain: &str) -> Result<Vec<DesignFile>> {
        anyhow::bail!("malformed project domain: '{}'", project_domain)
    }

    async fn fetch_content(&self, _file_id: &str) -> Result<String> {
        anyhow::bail!("unreachable in this test")
    }
}

struct NullFetcher;

#[async_trait]
impl PageFetcher for NullFetcher {
    async fn fetch(&self, _url: &str, _high_fidelity: bool) -> Option<String> {
        None
    }
}

/// Accepts `quota_after` submissions, then reports quota exhaustion.
struct QuotaProcessor {
    quota_after: usize,
    accepted: AtomicUsize,
    submitted: Mutex<Vec<String>>,
}

#[async_trait]
impl EmbeddingProcessor for QuotaProcessor {
    async fn submit(&self, _source_id: &str, file: &SubmittedFile) -> Result<(), SubmitError> {
        let n = self.accepted.fetch_add(1, Ordering::SeqCst);
        if n >= self.quota_after {
            return Err(SubmitError::QuotaExceeded);
        }
        self.submitted.lock().unwrap().push(file.path.clone());
        Ok(())
    }
}

fn upload_source(id: &str, paths: &[&str]) -> Source {
    Source {
        id: id.to_string(),
        kind: SourceKind::ApiUpload {
            items: paths
                .iter()
                .map(|p| UploadItem {
                    path: p.to_string(),
                    name: p.rsplit('/').next().unwrap_or(p).to_string(),
                    content: format!("content of {}", p),
                })
                .collect(),
        },
    }
}

fn config(sources: Vec<Source>) -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from("unused.sqlite"),
        },
        sync: SyncConfig {
            concurrency: 5,
            include_globs: vec!["**".to_string()],
            exclude_globs: vec![],
            high_fidelity_renderer: false,
        },
        retrieval: RetrievalConfig {
            limit: 20,
            snippet_length: 200,
        },
        project: ProjectConfig {
            id: "default".to_string(),
        },
        sources,
    }
}

fn deps(processor: Arc<dyn EmbeddingProcessor>) -> SyncDeps {
    SyncDeps {
        processor,
        checksums: Arc::new(EmptyChecksums),
        design_client: Arc::new(FailingDesignClient),
        fetcher: Arc::new(NullFetcher),
    }
}

#[tokio::test]
async fn source_level_failure_does_not_stop_later_sources() {
    let cfg = config(vec![
        Source {
            id: "broken-design".to_string(),
            kind: SourceKind::DesignTool {
                project_domain: "???".to_string(),
            },
        },
        upload_source("uploads", &["docs/a.md", "docs/b.md"]),
    ]);
    let processor = Arc::new(QuotaProcessor {
        quota_after: usize::MAX,
        accepted: AtomicUsize::new(0),
        submitted: Mutex::new(Vec::new()),
    });
    let ctx = Arc::new(SyncContext::new(Arc::new(NoopObserver)));

    let summary = run_sync(&cfg, &ctx, &deps(processor.clone())).await.unwrap();

    // The broken source contributes one error; the upload source still ran.
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].contains("broken-design"));
    assert_eq!(summary.per_source.len(), 1);
    assert_eq!(summary.per_source[0].0, "uploads");
    assert_eq!(processor.submitted.lock().unwrap().len(), 2);
    assert_eq!(ctx.state(), TrainingState::Idle);
}

#[tokio::test]
async fn quota_halts_remaining_sources_and_returns_to_idle() {
    let cfg = config(vec![
        upload_source("first", &["a.md", "b.md"]),
        upload_source("second", &["c.md"]),
    ]);
    let processor = Arc::new(QuotaProcessor {
        quota_after: 1,
        accepted: AtomicUsize::new(0),
        submitted: Mutex::new(Vec::new()),
    });
    let ctx = Arc::new(SyncContext::new(Arc::new(NoopObserver)));

    let summary = run_sync(&cfg, &ctx, &deps(processor.clone())).await.unwrap();

    assert!(summary.quota_exhausted);
    // The second source never ran.
    assert!(summary.per_source.iter().all(|(id, _)| id != "second"));
    assert!(summary
        .errors
        .iter()
        .any(|e| e.contains("quota exceeded")));
    assert_eq!(ctx.state(), TrainingState::Idle);
}

#[tokio::test]
async fn second_sync_cannot_start_while_one_is_active() {
    let cfg = config(vec![]);
    let ctx = Arc::new(SyncContext::new(Arc::new(NoopObserver)));
    assert!(ctx.try_begin());

    let processor = Arc::new(QuotaProcessor {
        quota_after: usize::MAX,
        accepted: AtomicUsize::new(0),
        submitted: Mutex::new(Vec::new()),
    });
    let err = run_sync(&cfg, &ctx, &deps(processor)).await.unwrap_err();
    assert!(err.to_string().contains("already running"));
}
