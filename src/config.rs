use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::Source;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Use the higher-fidelity page renderer for website sources.
    /// Gated by team entitlement upstream; plain HTTP GET when false.
    #[serde(default)]
    pub high_fidelity_renderer: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            high_fidelity_renderer: false,
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_include_globs() -> Vec<String> {
    vec!["**".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            snippet_length: default_snippet_length(),
        }
    }
}

fn default_limit() -> i64 {
    20
}

fn default_snippet_length() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    #[serde(default = "default_project_id")]
    pub id: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            id: default_project_id(),
        }
    }
}

fn default_project_id() -> String {
    "default".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.sync.concurrency == 0 {
        anyhow::bail!("sync.concurrency must be >= 1");
    }

    if !(1..=20).contains(&config.retrieval.limit) {
        anyhow::bail!("retrieval.limit must be in [1, 20]");
    }

    if config.retrieval.snippet_length == 0 {
        anyhow::bail!("retrieval.snippet_length must be > 0");
    }

    let mut seen = HashSet::new();
    for source in &config.sources {
        if !seen.insert(source.id.as_str()) {
            anyhow::bail!("Duplicate source id: '{}'", source.id);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("corpus.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[db]\npath = \"data/corpus.sqlite\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.sync.concurrency, 5);
        assert_eq!(config.retrieval.limit, 20);
        assert_eq!(config.retrieval.snippet_length, 200);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn duplicate_source_ids_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[db]
path = "data/corpus.sqlite"

[[sources]]
id = "a"
type = "website"
url = "https://example.com"

[[sources]]
id = "a"
type = "website"
url = "https://example.org"
"#,
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn limit_over_twenty_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[db]\npath = \"c.sqlite\"\n\n[retrieval]\nlimit = 50\n",
        );
        assert!(load_config(&path).is_err());
    }
}
