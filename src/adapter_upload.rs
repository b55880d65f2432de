//! Upload adapters.
//!
//! `file-upload` sources point at a local staging directory where uploads
//! land; the adapter walks it once and reads content on resolve.
//! `api-upload` sources carry their items inline, so resolution is a copy.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use walkdir::WalkDir;

use crate::adapter::{ResolvedItem, SourceAdapter};
use crate::models::UploadItem;

pub struct StagedUploadAdapter {
    root: PathBuf,
    paths: Vec<String>,
}

impl StagedUploadAdapter {
    /// Walk the staging directory and record relative paths, sorted for
    /// deterministic enumeration.
    pub fn scan(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("Upload staging directory does not exist: {}", root.display());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            paths.push(relative.to_string_lossy().replace('\\', "/"));
        }
        paths.sort();

        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }
}

#[async_trait]
impl SourceAdapter for StagedUploadAdapter {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn path(&self, index: usize) -> &str {
        &self.paths[index]
    }

    async fn resolve(&self, index: usize) -> Result<ResolvedItem> {
        let relative = &self.paths[index];
        let full = self.root.join(relative);
        let content = tokio::fs::read_to_string(&full)
            .await
            .with_context(|| format!("Failed to read upload: {}", full.display()))?;
        let name = relative.rsplit('/').next().unwrap_or(relative).to_string();
        Ok(ResolvedItem {
            name,
            content: Some(content),
        })
    }
}

pub struct ApiUploadAdapter {
    items: Vec<UploadItem>,
}

impl ApiUploadAdapter {
    pub fn new(items: Vec<UploadItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl SourceAdapter for ApiUploadAdapter {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn path(&self, index: usize) -> &str {
        &self.items[index].path
    }

    async fn resolve(&self, index: usize) -> Result<ResolvedItem> {
        let item = &self.items[index];
        Ok(ResolvedItem {
            name: item.name.clone(),
            content: Some(item.content.clone()),
        })
    }
}
