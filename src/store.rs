//! Storage collaborator contracts.
//!
//! The relational/vector engine is external; the pipeline and search
//! service only depend on these narrow traits. [`crate::sqlite_store`]
//! carries the bundled SQLite reference implementation.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{FileChecksum, FileMeta, SearchMatch};

/// Bulk incremental-sync lookup, read once per sync before the item loop.
#[async_trait]
pub trait ChecksumStore: Send + Sync {
    /// All `path → checksum` pairs previously ingested for a source.
    async fn load_checksums(&self, source_id: &str) -> Result<Vec<FileChecksum>>;
}

/// Full-text ranking backend plus the file-metadata join.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Ranked section matches for a query, bounded to `limit`.
    async fn search(&self, query: &str, project_id: &str, limit: i64) -> Result<Vec<SearchMatch>>;

    /// Metadata for each file id, one join query. Ids are distinct and
    /// sorted; missing files are simply absent from the result.
    async fn join_file_metadata(&self, file_ids: &[String]) -> Result<Vec<FileMeta>>;
}
