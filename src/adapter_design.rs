//! Design-tool adapter.
//!
//! Lists public file metadata for a project domain once, then fetches
//! content for one file id at a time. The listing client is a trait so the
//! proprietary API stays outside this crate.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::adapter::{ResolvedItem, SourceAdapter};

/// Metadata row returned by the design-tool listing endpoint.
#[derive(Debug, Clone)]
pub struct DesignFile {
    pub id: String,
    pub path: String,
    pub name: String,
}

/// Client contract for the proprietary design-tool API.
#[async_trait]
pub trait DesignToolClient: Send + Sync {
    /// List the public files for a project domain. A malformed or unknown
    /// domain fails here and aborts the source.
    async fn list_files(&self, project_domain: &str) -> Result<Vec<DesignFile>>;

    /// Fetch the content for a single file id.
    async fn fetch_content(&self, file_id: &str) -> Result<String>;
}

/// REST client against the design tool's public export API. File ids
/// returned by the listing are absolute content URLs, so `fetch_content`
/// needs no separate notion of the project domain.
pub struct HttpDesignClient {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ListedFile {
    id: String,
    path: String,
    name: String,
}

impl HttpDesignClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("corpus-sync/0.3")
            .timeout(std::time::Duration::from_secs(60))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DesignToolClient for HttpDesignClient {
    async fn list_files(&self, project_domain: &str) -> Result<Vec<DesignFile>> {
        let domain = project_domain.trim().trim_end_matches('/');
        if domain.is_empty() || domain.contains('/') || domain.contains(' ') {
            anyhow::bail!("malformed project domain: '{}'", project_domain);
        }

        let url = format!("https://{}/api/export/files", domain);
        let listed: Vec<ListedFile> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("listing files for {}", domain))?
            .error_for_status()?
            .json()
            .await?;

        Ok(listed
            .into_iter()
            .map(|f| DesignFile {
                id: format!("https://{}/api/export/files/{}/content", domain, f.id),
                path: f.path,
                name: f.name,
            })
            .collect())
    }

    async fn fetch_content(&self, file_id: &str) -> Result<String> {
        let body = self
            .client
            .get(file_id)
            .send()
            .await
            .with_context(|| format!("fetching {}", file_id))?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

pub struct DesignAdapter {
    client: Arc<dyn DesignToolClient>,
    files: Vec<DesignFile>,
}

impl DesignAdapter {
    pub async fn list(client: Arc<dyn DesignToolClient>, project_domain: &str) -> Result<Self> {
        let mut files = client.list_files(project_domain).await?;
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self { client, files })
    }
}

#[async_trait]
impl SourceAdapter for DesignAdapter {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn path(&self, index: usize) -> &str {
        &self.files[index].path
    }

    async fn resolve(&self, index: usize) -> Result<ResolvedItem> {
        let file = &self.files[index];
        let content = self.client.fetch_content(&file.id).await?;
        Ok(ResolvedItem {
            name: file.name.clone(),
            content: Some(content),
        })
    }
}
