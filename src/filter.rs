//! Path filtering applied before any expensive content fetch.
//!
//! Rejection order: dot segments, vendored directories, unsupported file
//! types, then the include/exclude glob sets. A path must match at least one
//! include glob and no exclude glob; when nothing matches it is denied.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// File types the pipeline ingests. Anything else is skipped silently.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "md", "txt", "rs", "ts", "tsx", "js", "jsx", "py", "json", "toml", "yaml", "yml", "html",
    "htm", "css", "scss", "go", "java", "c", "cpp", "h", "hpp", "sh", "bash", "zsh", "sql", "xml",
    "csv",
];

/// Directory names never worth ingesting, regardless of globs.
const VENDORED_DIRS: &[&str] = &["node_modules", "target", "vendor", "dist", "build"];

/// Compiled include/exclude filter for one sync pass.
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include_globs: &[String], exclude_globs: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_globset(include_globs)?,
            exclude: build_globset(exclude_globs)?,
        })
    }

    /// Decide whether a candidate path enters the pipeline.
    pub fn should_include(&self, path: &str) -> bool {
        // A root URL strips down to an empty path; treat it as the site
        // index page so glob matching has something to bite on.
        let relevant = match strip_scheme(path) {
            "" => "index",
            rest => rest,
        };

        for segment in relevant.split('/') {
            if segment.starts_with('.') && segment.len() > 1 {
                return false;
            }
            if VENDORED_DIRS.contains(&segment) {
                return false;
            }
        }

        if !has_supported_type(relevant) {
            return false;
        }

        if self.exclude.is_match(relevant) {
            return false;
        }

        self.include.is_match(relevant)
    }
}

/// Root URLs get a trailing slash before extension inspection, so
/// `https://x.com` is not mistaken for a file with extension `.com`.
pub fn normalize_root_url(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        if !rest.is_empty() && !rest.contains('/') {
            return format!("{}/", url);
        }
    }
    url.to_string()
}

/// Drop `scheme://host` from URLs so globs and segment checks see the path.
fn strip_scheme(path: &str) -> &str {
    match path.find("://") {
        Some(scheme_end) => {
            let rest = &path[scheme_end + 3..];
            match rest.find('/') {
                Some(slash) => &rest[slash + 1..],
                None => rest,
            }
        }
        None => path,
    }
}

/// A path with no extension is treated as plain text (LICENSE, Makefile,
/// directory-style URLs). A path with an extension must carry a supported one.
fn has_supported_type(path: &str) -> bool {
    let basename = path.rsplit('/').next().unwrap_or(path);
    match basename.rfind('.') {
        // A leading dot is a dotfile, handled by the segment check; a dot at
        // position 0 here means no real extension.
        Some(0) | None => true,
        Some(pos) => {
            let ext = basename[pos + 1..].to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
