//! GitHub repository adapter.
//!
//! Downloads the repository archive for `(url, branch)` once, decompresses
//! it in memory, and yields one candidate per archive entry. Content needs
//! no second fetch. An archive that cannot be found is a source-level
//! failure: the whole source aborts with one error.

use std::io::{Cursor, Read};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use zip::ZipArchive;

use crate::adapter::{ResolvedItem, SourceAdapter};

const DEFAULT_BRANCH: &str = "main";

/// One decompressed archive entry.
#[derive(Debug, Clone)]
struct ArchiveEntry {
    path: String,
    name: String,
    content: String,
}

pub struct GithubAdapter {
    entries: Vec<ArchiveEntry>,
}

impl GithubAdapter {
    /// Download and unpack the zipball for the repository.
    pub async fn fetch(url: &str, branch: Option<&str>) -> Result<Self> {
        let branch = branch.unwrap_or(DEFAULT_BRANCH);
        let archive_url = format!(
            "{}/archive/refs/heads/{}.zip",
            url.trim_end_matches('/').trim_end_matches(".git"),
            branch
        );

        let client = reqwest::Client::builder()
            .user_agent("corpus-sync/0.3")
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let response = client
            .get(&archive_url)
            .send()
            .await
            .with_context(|| format!("Failed to download archive: {}", archive_url))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            bail!("Repository archive not found: {} ({})", url, branch);
        }
        if !response.status().is_success() {
            bail!(
                "Archive download failed with status {}: {}",
                response.status(),
                archive_url
            );
        }

        let bytes = response.bytes().await?;
        Self::from_zip_bytes(&bytes)
    }

    /// Unpack an already-downloaded zipball. The top-level `repo-branch/`
    /// directory the archive wraps everything in is stripped.
    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Failed to read repository archive")?;

        let mut entries = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }

            let raw_name = entry.name().to_string();
            let path = match raw_name.split_once('/') {
                Some((_, rest)) if !rest.is_empty() => rest.to_string(),
                _ => continue,
            };

            let mut buf = Vec::new();
            entry.read_to_end(&mut buf)?;
            // Binary entries are carried through lossily; the type filter
            // keeps them out of the pipeline anyway.
            let content = String::from_utf8_lossy(&buf).into_owned();

            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            entries.push(ArchiveEntry {
                path,
                name,
                content,
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { entries })
    }
}

#[async_trait]
impl SourceAdapter for GithubAdapter {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn path(&self, index: usize) -> &str {
        &self.entries[index].path
    }

    async fn resolve(&self, index: usize) -> Result<ResolvedItem> {
        let entry = &self.entries[index];
        Ok(ResolvedItem {
            name: entry.name.clone(),
            content: Some(entry.content.clone()),
        })
    }
}
