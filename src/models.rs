//! Core data models used throughout corpus-sync.
//!
//! These types represent the sources, file records, and search results that
//! flow through the ingestion and retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A declared content source owned by a project. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

/// Closed set of source variants. The variant payload carries everything an
/// adapter needs to enumerate the source; matching on this enum is exhaustive
/// so adding a variant is a compile error everywhere it is dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceKind {
    /// GitHub repository, ingested from a one-shot archive download.
    Github {
        url: String,
        #[serde(default)]
        branch: Option<String>,
    },
    /// Proprietary design-tool project, listed by public project domain.
    DesignTool { project_domain: String },
    /// Arbitrary website, enumerated by the crawler.
    Website { url: String },
    /// Direct uploads staged in a local directory.
    FileUpload { staging_dir: PathBuf },
    /// Direct uploads passed inline over the API.
    ApiUpload {
        #[serde(default)]
        items: Vec<UploadItem>,
    },
}

impl SourceKind {
    /// Stable label for logs and summary output.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Github { .. } => "github",
            SourceKind::DesignTool { .. } => "design-tool",
            SourceKind::Website { .. } => "website",
            SourceKind::FileUpload { .. } => "file-upload",
            SourceKind::ApiUpload { .. } => "api-upload",
        }
    }
}

/// A directly uploaded item: content is already in hand, no fetch needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    pub path: String,
    pub name: String,
    pub content: String,
}

/// One `path → checksum` entry from the bulk incremental-sync lookup.
#[derive(Debug, Clone)]
pub struct FileChecksum {
    pub path: String,
    pub checksum: String,
}

/// One indexed, searchable chunk of a file's content.
#[derive(Debug, Clone)]
pub struct Section {
    pub id: String,
    pub file_id: String,
    pub section_index: i64,
    pub content: String,
    pub meta: serde_json::Value,
}

/// Raw rank result from the full-text index.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub file_id: String,
    pub content: String,
    pub meta: serde_json::Value,
    pub score: f64,
}

/// File metadata joined onto matches, one row per distinct file.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub id: String,
    pub path: String,
    pub meta: serde_json::Value,
    pub source_type: String,
    pub source_data: serde_json::Value,
}

/// One grouped result as returned to a caller: a file plus the matched
/// sections in match order.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub meta: serde_json::Value,
    pub source_type: String,
    pub source_data: serde_json::Value,
    pub score: f64,
    pub sections: Vec<ResultSection>,
}

/// Snippet entry within a [`SearchResult`].
#[derive(Debug, Clone, Serialize)]
pub struct ResultSection {
    pub content: String,
    pub meta: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_round_trips_through_toml() {
        let raw = r#"
            id = "docs"
            type = "github"
            url = "https://github.com/acme/docs"
            branch = "main"
        "#;
        let source: Source = toml::from_str(raw).unwrap();
        assert_eq!(source.id, "docs");
        match source.kind {
            SourceKind::Github { ref url, ref branch } => {
                assert_eq!(url, "https://github.com/acme/docs");
                assert_eq!(branch.as_deref(), Some("main"));
            }
            _ => panic!("expected github variant"),
        }
    }

    #[test]
    fn website_kind_label() {
        let kind = SourceKind::Website {
            url: "https://example.com".to_string(),
        };
        assert_eq!(kind.label(), "website");
    }
}
