//! Error taxonomy for the sync and search pipelines.
//!
//! The propagation policy distinguishes four classes during a sync:
//! quota exhaustion halts the whole multi-source pass, source-level failures
//! abort one source, per-file failures are aggregated and the pass continues,
//! and crawl-round failures stop crawling without surfacing an error.

use thiserror::Error;

/// Failure returned by the external embedding processor for one submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The account's content-processing allowance is exhausted. The only
    /// fatal class: no further submissions start in this sync pass.
    #[error("content processing quota exceeded")]
    QuotaExceeded,

    /// Any other processor failure. Recorded against the file, sync continues.
    #[error("{0}")]
    Other(String),
}

/// Fatal error from one sync pass.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("content processing quota exceeded")]
    QuotaExceeded,

    /// The entire source is unusable (archive not found, malformed domain).
    /// Aborts this source only; the orchestrator continues with the next.
    #[error("source '{source_id}': {message}")]
    SourceLevel { source_id: String, message: String },
}

impl SyncError {
    pub fn source_level(source_id: impl Into<String>, message: impl ToString) -> Self {
        SyncError::SourceLevel {
            source_id: source_id.into(),
            message: message.to_string(),
        }
    }
}

/// Error surfaced by the search service.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Retrieval failure from the full-text index, surfaced with the
    /// underlying message and no partial results.
    #[error("search backend error: {0}")]
    Backend(String),
}
