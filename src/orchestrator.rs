//! Sync orchestration.
//!
//! Runs every configured source in sequence through the pipeline, with one
//! [`SyncContext`] guarding exclusivity and collecting errors. Source-level
//! failures are recorded and the remaining sources still run; quota
//! exhaustion halts the whole sync because every further submission would
//! fail the same way.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::adapter::adapter_for;
use crate::adapter_design::DesignToolClient;
use crate::config::Config;
use crate::crawler::sync_website;
use crate::error::SyncError;
use crate::fetch::PageFetcher;
use crate::filter::PathFilter;
use crate::models::SourceKind;
use crate::pipeline::{Pipeline, SyncReport};
use crate::processor::EmbeddingProcessor;
use crate::state::SyncContext;
use crate::store::ChecksumStore;

/// Collaborators for one sync run. All trait objects, so tests and the CLI
/// wire in whatever backends they need.
pub struct SyncDeps {
    pub processor: Arc<dyn EmbeddingProcessor>,
    pub checksums: Arc<dyn ChecksumStore>,
    pub design_client: Arc<dyn DesignToolClient>,
    pub fetcher: Arc<dyn PageFetcher>,
}

/// Aggregate result of one sync run across all sources.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub per_source: Vec<(String, SyncReport)>,
    pub errors: Vec<String>,
    pub quota_exhausted: bool,
    pub cancelled: bool,
}

/// Sync every configured source. Returns an error only when a sync is
/// already running; everything else is reported through the summary.
pub async fn run_sync(
    config: &Config,
    ctx: &Arc<SyncContext>,
    deps: &SyncDeps,
) -> Result<SyncSummary> {
    if !ctx.try_begin() {
        bail!("a sync is already running");
    }

    let filter = match PathFilter::new(&config.sync.include_globs, &config.sync.exclude_globs) {
        Ok(f) => Arc::new(f),
        Err(e) => {
            ctx.complete();
            return Err(e);
        }
    };

    let mut summary = SyncSummary::default();

    for source in &config.sources {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let website = matches!(source.kind, SourceKind::Website { .. });
        let pipeline = Pipeline {
            source_id: source.id.clone(),
            filter: filter.clone(),
            processor: deps.processor.clone(),
            concurrency: config.sync.concurrency,
            website,
        };

        tracing::info!("syncing source {} ({})", source.id, source.kind.label());

        let result = match &source.kind {
            SourceKind::Website { url } => {
                sync_website(
                    ctx,
                    &pipeline,
                    deps.fetcher.clone(),
                    url,
                    config.sync.high_fidelity_renderer,
                    deps.checksums.as_ref(),
                )
                .await
            }
            _ => match adapter_for(source, deps.design_client.clone()).await {
                Ok(adapter) => {
                    pipeline
                        .sync(ctx, Arc::from(adapter), deps.checksums.as_ref())
                        .await
                }
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(report) => summary.per_source.push((source.id.clone(), report)),
            Err(SyncError::QuotaExceeded) => {
                // Further submissions would all fail the same way.
                ctx.record_error("embedding quota exceeded".to_string());
                summary.quota_exhausted = true;
                break;
            }
            Err(SyncError::SourceLevel { source_id, message }) => {
                ctx.record_error(format!("{}: {}", source_id, message));
            }
        }
    }

    if ctx.is_cancelled() {
        summary.cancelled = true;
    }

    summary.errors = ctx.errors();
    ctx.complete();
    Ok(summary)
}

impl SyncSummary {
    /// One-screen text summary in `source: submitted/unchanged/...` form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (source_id, report) in &self.per_source {
            out.push_str(&format!(
                "{}: {} scanned, {} submitted, {} unchanged, {} filtered, {} failed\n",
                source_id,
                report.scanned,
                report.submitted,
                report.unchanged,
                report.filtered,
                report.failed
            ));
        }
        if self.quota_exhausted {
            out.push_str("halted: embedding quota exceeded\n");
        }
        if self.cancelled {
            out.push_str("cancelled\n");
        }
        for error in &self.errors {
            out.push_str(&format!("error: {}\n", error));
        }
        out
    }
}
