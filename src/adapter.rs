//! Source adapter contract.
//!
//! An adapter enumerates an ordered sequence of candidate items for one
//! source and resolves name + content lazily: `path()` is cheap and is all
//! the pipeline needs for filtering and checksum lookup, while `resolve()`
//! may hit the network and is only called for items that pass the filter.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::adapter_design::{DesignAdapter, DesignToolClient};
use crate::adapter_github::GithubAdapter;
use crate::adapter_upload::{ApiUploadAdapter, StagedUploadAdapter};
use crate::error::SyncError;
use crate::models::{Source, SourceKind};

/// Name + content for one resolved candidate.
#[derive(Debug, Clone)]
pub struct ResolvedItem {
    pub name: String,
    /// `None` means the source produced no content at all (a failed page
    /// fetch). A file that is genuinely empty is `Some("")` and goes
    /// through the checksum diff like any other content change.
    pub content: Option<String>,
}

/// Per-source-type capability: enumerate candidates, resolve them on demand.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Number of candidate items.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate path at `index`. Cheap; no content fetch.
    fn path(&self, index: usize) -> &str;

    /// Fetch name + content for the candidate at `index`. Expensive; only
    /// called after the path passes the include/exclude filter.
    async fn resolve(&self, index: usize) -> Result<ResolvedItem>;
}

/// Build the adapter for a non-website source. Enumeration failures here are
/// source-level: the whole source is unusable and surfaces one error.
///
/// Website sources are enumerated round-by-round by the crawler and do not
/// come through this constructor.
pub async fn adapter_for(
    source: &Source,
    design_client: Arc<dyn DesignToolClient>,
) -> Result<Box<dyn SourceAdapter>, SyncError> {
    match &source.kind {
        SourceKind::Github { url, branch } => {
            let adapter = GithubAdapter::fetch(url, branch.as_deref())
                .await
                .map_err(|e| SyncError::source_level(&source.id, e))?;
            Ok(Box::new(adapter))
        }
        SourceKind::DesignTool { project_domain } => {
            let adapter = DesignAdapter::list(design_client, project_domain)
                .await
                .map_err(|e| SyncError::source_level(&source.id, e))?;
            Ok(Box::new(adapter))
        }
        SourceKind::Website { .. } => Err(SyncError::source_level(
            &source.id,
            "website sources are enumerated by the crawler",
        )),
        SourceKind::FileUpload { staging_dir } => {
            let adapter = StagedUploadAdapter::scan(staging_dir)
                .map_err(|e| SyncError::source_level(&source.id, e))?;
            Ok(Box::new(adapter))
        }
        SourceKind::ApiUpload { items } => Ok(Box::new(ApiUploadAdapter::new(items.clone()))),
    }
}
