//! Ingestion pipeline.
//!
//! Runs every candidate index of an adapter through the per-item flow:
//! filter → progress → resolve → checksum diff → submit. All indices are
//! scheduled against a bounded worker pool; a cooperative cancellation flag
//! and the quota-halt flag are consulted once per item at dispatch, so items
//! already past their check-point run to completion. Completion order within
//! the pool is unspecified; outcomes are collected and re-sorted by original
//! item index so error ordering stays deterministic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapter::SourceAdapter;
use crate::error::{SubmitError, SyncError};
use crate::filter::{normalize_root_url, PathFilter};
use crate::processor::{EmbeddingProcessor, SubmittedFile};
use crate::state::SyncContext;
use crate::store::ChecksumStore;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Shared progress counters for one sync. The done counter only moves
/// forward; the crawler grows the total as new frontier rounds begin.
pub struct Progress {
    done: AtomicU64,
    total: AtomicU64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            done: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    pub fn add_total(&self, n: u64) {
        self.total.fetch_add(n, Ordering::SeqCst);
    }

    /// Claim the next progress slot. Monotonic across the whole sync.
    fn next(&self) -> (u64, u64) {
        let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        (n, self.total.load(Ordering::SeqCst))
    }
}

/// Terminal status of one candidate item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    /// Rejected by the path filter; no content fetched, no callback.
    Filtered,
    /// Checksum matched the previous sync; no submission, no callback.
    Unchanged,
    /// Resolution produced no content at all (failed page fetch); nothing
    /// to diff or ingest. Empty content does not land here.
    Unfetchable,
    /// Submitted to the embedding processor successfully.
    Submitted,
    /// Per-file failure (resolve or submission); recorded, sync continues.
    Failed(String),
    /// Submission hit the embedding quota. Reported once at the source
    /// level, not per file.
    QuotaExhausted,
    /// Never started: cancellation or quota halt hit before dispatch.
    NotStarted,
}

/// Outcome of one candidate, in original index order after collection.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub index: usize,
    pub path: String,
    /// Resolved content, when resolution happened. The crawler extracts
    /// links from this even for unchanged pages.
    pub content: Option<String>,
    pub status: ItemStatus,
}

/// Aggregate counts for one source's sync, for summary output.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub scanned: usize,
    pub filtered: usize,
    pub unchanged: usize,
    pub submitted: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn absorb(&mut self, outcomes: &[ItemOutcome]) {
        for outcome in outcomes {
            self.scanned += 1;
            match outcome.status {
                ItemStatus::Filtered => self.filtered += 1,
                ItemStatus::Unchanged => self.unchanged += 1,
                ItemStatus::Submitted => self.submitted += 1,
                ItemStatus::Failed(_) | ItemStatus::QuotaExhausted => self.failed += 1,
                ItemStatus::Unfetchable | ItemStatus::NotStarted => {}
            }
        }
    }
}

/// Per-source pipeline configuration, shared across batches of one sync.
pub struct Pipeline {
    pub source_id: String,
    pub filter: Arc<PathFilter>,
    pub processor: Arc<dyn EmbeddingProcessor>,
    pub concurrency: usize,
    /// Website sources get root-URL normalization before type inspection.
    pub website: bool,
}

impl Pipeline {
    /// Full sync for a list-style adapter: bulk checksum load, then one
    /// batch over every candidate index.
    pub async fn sync(
        &self,
        ctx: &Arc<SyncContext>,
        adapter: Arc<dyn SourceAdapter>,
        checksums: &dyn ChecksumStore,
    ) -> Result<SyncReport, SyncError> {
        let previous = self.load_previous(ctx, checksums).await?;
        let progress = Arc::new(Progress::new(adapter.len() as u64));

        let outcomes = self.process_batch(ctx, adapter, &previous, &progress).await?;

        let mut report = SyncReport::default();
        report.absorb(&outcomes);
        Ok(report)
    }

    /// One bulk checksum read per sync, before the per-item loop begins.
    pub async fn load_previous(
        &self,
        _ctx: &Arc<SyncContext>,
        checksums: &dyn ChecksumStore,
    ) -> Result<Arc<HashMap<String, String>>, SyncError> {
        let rows = checksums
            .load_checksums(&self.source_id)
            .await
            .map_err(|e| SyncError::source_level(&self.source_id, e))?;
        let map: HashMap<String, String> =
            rows.into_iter().map(|c| (c.path, c.checksum)).collect();
        Ok(Arc::new(map))
    }

    /// Process every index of `adapter` against a bounded pool. Returns
    /// outcomes sorted by index, or [`SyncError::QuotaExceeded`] once the
    /// processor reports quota exhaustion (in-flight items still finish and
    /// their per-file errors are still recorded).
    pub async fn process_batch(
        &self,
        ctx: &Arc<SyncContext>,
        adapter: Arc<dyn SourceAdapter>,
        previous: &Arc<HashMap<String, String>>,
        progress: &Arc<Progress>,
    ) -> Result<Vec<ItemOutcome>, SyncError> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let quota_hit = Arc::new(AtomicBool::new(false));
        let mut tasks: JoinSet<ItemOutcome> = JoinSet::new();

        for index in 0..adapter.len() {
            let semaphore = semaphore.clone();
            let quota_hit = quota_hit.clone();
            let ctx = ctx.clone();
            let adapter = adapter.clone();
            let previous = previous.clone();
            let progress = progress.clone();
            let filter = self.filter.clone();
            let processor = self.processor.clone();
            let source_id = self.source_id.clone();
            let website = self.website;

            tasks.spawn(async move {
                // Pool admission. Permit held for the item's whole lifetime
                // bounds in-flight work to the configured width.
                let permit = semaphore.acquire_owned().await;
                let _permit = match permit {
                    Ok(p) => p,
                    Err(_) => {
                        return ItemOutcome {
                            index,
                            path: adapter.path(index).to_string(),
                            content: None,
                            status: ItemStatus::NotStarted,
                        }
                    }
                };

                let raw_path = adapter.path(index).to_string();
                let path = if website {
                    normalize_root_url(&raw_path)
                } else {
                    raw_path
                };

                // Cooperative check-point: once set, items that have not
                // started return immediately without side effects.
                if ctx.is_cancelled() || quota_hit.load(Ordering::SeqCst) {
                    return ItemOutcome {
                        index,
                        path,
                        content: None,
                        status: ItemStatus::NotStarted,
                    };
                }

                if !filter.should_include(&path) {
                    return ItemOutcome {
                        index,
                        path,
                        content: None,
                        status: ItemStatus::Filtered,
                    };
                }

                // Progress before any expensive work, so feedback stays
                // monotonic even when later steps skip.
                let (n, total) = progress.next();
                ctx.loading(n, total, basename(&path));

                let prev_checksum = previous.get(&path);

                let resolved = match adapter.resolve(index).await {
                    Ok(item) => item,
                    Err(e) => {
                        ctx.file_processed();
                        return ItemOutcome {
                            index,
                            path,
                            content: None,
                            status: ItemStatus::Failed(e.to_string()),
                        };
                    }
                };

                // Unfetchable pages are skipped without touching the diff;
                // a file whose content became empty still flows through and
                // supersedes what the previous sync indexed.
                let Some(content) = resolved.content else {
                    ctx.file_processed();
                    return ItemOutcome {
                        index,
                        path,
                        content: None,
                        status: ItemStatus::Unfetchable,
                    };
                };

                let current = crate::checksum::checksum(&content);
                if prev_checksum.map(String::as_str) == Some(current.as_str()) {
                    // Incremental-sync contract: unchanged content costs no
                    // embedding work.
                    return ItemOutcome {
                        index,
                        path,
                        content: Some(content),
                        status: ItemStatus::Unchanged,
                    };
                }

                let file = SubmittedFile {
                    path: path.clone(),
                    name: resolved.name,
                    content,
                };
                let status = match processor.submit(&source_id, &file).await {
                    Ok(()) => ItemStatus::Submitted,
                    Err(SubmitError::QuotaExceeded) => {
                        quota_hit.store(true, Ordering::SeqCst);
                        ItemStatus::QuotaExhausted
                    }
                    Err(SubmitError::Other(message)) => ItemStatus::Failed(message),
                };
                ctx.file_processed();

                ItemOutcome {
                    index,
                    path,
                    content: Some(file.content),
                    status,
                }
            });
        }

        let mut outcomes = Vec::with_capacity(adapter.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    tracing::warn!("sync task panicked: {}", e);
                }
            }
        }

        // Deterministic error ordering by original item index, even though
        // completion order within the pool is unspecified.
        outcomes.sort_by_key(|o| o.index);

        for outcome in &outcomes {
            if let ItemStatus::Failed(message) = &outcome.status {
                ctx.record_error(format!("{}: {}", outcome.path, message));
            }
        }

        if quota_hit.load(Ordering::SeqCst) {
            return Err(SyncError::QuotaExceeded);
        }

        Ok(outcomes)
    }
}

fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}
