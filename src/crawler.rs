//! Website crawler.
//!
//! Two mutually exclusive modes, chosen from the source URL. Sitemap mode
//! parses the document for page URLs and takes at most the first
//! [`SITEMAP_PAGE_LIMIT`]. Link-discovery mode runs a breadth-first crawl:
//! each round hands the entire current frontier to the ingestion pipeline as
//! one concurrency-limited batch, then extracts hyperlinks from the fetched
//! HTML and sets the next frontier to `discovered − processed`. The visited
//! set makes cyclic link graphs terminate; a failed round stops crawling and
//! keeps whatever was ingested.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use scraper::{Html, Selector};
use url::Url;

use crate::adapter::{ResolvedItem, SourceAdapter};
use crate::error::SyncError;
use crate::fetch::PageFetcher;
use crate::filter::normalize_root_url;
use crate::pipeline::{Pipeline, Progress, SyncReport};
use crate::state::SyncContext;
use crate::store::ChecksumStore;

/// Sitemap-mode cap on candidate pages.
pub const SITEMAP_PAGE_LIMIT: usize = 10;

/// One crawl round's frontier, presented to the pipeline as an adapter.
/// Resolution is the page fetch; a failed fetch is "no content", not an
/// error.
struct FrontierAdapter {
    urls: Vec<String>,
    fetcher: Arc<dyn PageFetcher>,
    high_fidelity: bool,
}

#[async_trait]
impl SourceAdapter for FrontierAdapter {
    fn len(&self) -> usize {
        self.urls.len()
    }

    fn path(&self, index: usize) -> &str {
        &self.urls[index]
    }

    async fn resolve(&self, index: usize) -> Result<ResolvedItem> {
        let url = &self.urls[index];
        // A failed fetch resolves to `None` so the pipeline skips the page
        // instead of diffing it as empty content.
        let content = self.fetcher.fetch(url, self.high_fidelity).await;
        let name = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(url)
            .to_string();
        Ok(ResolvedItem { name, content })
    }
}

/// Sync one website source end to end.
pub async fn sync_website(
    ctx: &Arc<SyncContext>,
    pipeline: &Pipeline,
    fetcher: Arc<dyn PageFetcher>,
    source_url: &str,
    high_fidelity: bool,
    checksums: &dyn ChecksumStore,
) -> Result<SyncReport, SyncError> {
    let previous = pipeline.load_previous(ctx, checksums).await?;
    let base = normalize_root_url(source_url);
    let base_parsed = Url::parse(&base)
        .map_err(|e| SyncError::source_level(&pipeline.source_id, format!("invalid URL: {}", e)))?;
    let base_norm = normalize_url(&base_parsed);

    let mut report = SyncReport::default();

    if is_sitemap_url(&base) {
        let urls: Vec<String> = fetch_sitemap_urls(fetcher.as_ref(), &base, high_fidelity)
            .await
            .into_iter()
            .take(SITEMAP_PAGE_LIMIT)
            .collect();
        tracing::info!("sitemap crawl of {}: {} pages", base, urls.len());

        let progress = Arc::new(Progress::new(urls.len() as u64));
        let adapter: Arc<dyn SourceAdapter> = Arc::new(FrontierAdapter {
            urls,
            fetcher,
            high_fidelity,
        });
        let outcomes = pipeline
            .process_batch(ctx, adapter, &previous, &progress)
            .await?;
        report.absorb(&outcomes);
        return Ok(report);
    }

    // Link-discovery mode: explicit visited set + frontier queue, both
    // scoped to this sync.
    let mut processed: HashSet<String> = HashSet::new();
    let mut frontier: Vec<String> = vec![base.clone()];
    let progress = Arc::new(Progress::new(0));
    let mut round = 0u32;

    while !frontier.is_empty() {
        if ctx.is_cancelled() {
            break;
        }

        round += 1;
        tracing::debug!("crawl round {}: {} pages", round, frontier.len());
        progress.add_total(frontier.len() as u64);
        processed.extend(frontier.iter().cloned());

        let adapter: Arc<dyn SourceAdapter> = Arc::new(FrontierAdapter {
            urls: frontier.clone(),
            fetcher: fetcher.clone(),
            high_fidelity,
        });
        let outcomes = match pipeline
            .process_batch(ctx, adapter, &previous, &progress)
            .await
        {
            Ok(outcomes) => outcomes,
            Err(SyncError::QuotaExceeded) => return Err(SyncError::QuotaExceeded),
            Err(e) => {
                // Round failure stops crawling; pages ingested so far stay.
                tracing::warn!("crawl round {} failed, stopping: {}", round, e);
                break;
            }
        };
        report.absorb(&outcomes);

        let mut seen_this_round: HashSet<String> = HashSet::new();
        let mut next_frontier: Vec<String> = Vec::new();
        for outcome in &outcomes {
            let Some(html) = &outcome.content else {
                continue;
            };
            for href in extract_links(html) {
                let Some(link) = scope_link(&base_parsed, &base_norm, &href) else {
                    continue;
                };
                if !processed.contains(&link) && seen_this_round.insert(link.clone()) {
                    next_frontier.push(link);
                }
            }
        }
        frontier = next_frontier;
    }

    Ok(report)
}

/// Whether a source URL is (or resolves to) a sitemap document.
pub fn is_sitemap_url(url: &str) -> bool {
    let path = url.split('?').next().unwrap_or(url);
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
    path.ends_with(".xml") || last.contains("sitemap")
}

/// Fetch and parse a sitemap into page URLs. Fetch failure yields no pages.
pub async fn fetch_sitemap_urls(
    fetcher: &dyn PageFetcher,
    url: &str,
    high_fidelity: bool,
) -> Vec<String> {
    match fetcher.fetch(url, high_fidelity).await {
        Some(xml) => parse_sitemap_urls(&xml),
        None => Vec::new(),
    }
}

/// Pull every `<loc>` value out of a sitemap document.
pub fn parse_sitemap_urls(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_loc = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"loc" => in_loc = true,
            Ok(Event::End(e)) if e.name().as_ref() == b"loc" => in_loc = false,
            Ok(Event::Text(t)) if in_loc => {
                if let Ok(text) = t.unescape() {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        urls.push(trimmed.to_string());
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    urls
}

/// All hyperlink hrefs in a page's raw HTML, in document order.
pub fn extract_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Decide whether a discovered href belongs to the crawl, and return its
/// normalized absolute form if so.
///
/// A link is "from the base URL" when it is absolute and its normalized
/// form starts with the base URL string; or it is root-relative and its path
/// starts with the base URL's path; or it is a pure relative reference.
/// `mailto:`, `tel:`, and other scheme-prefixed non-HTTP links are excluded.
pub fn scope_link(base: &Url, base_norm: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.contains(':') {
        let url = Url::parse(href).ok()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return None;
        }
        let normalized = normalize_url(&url);
        if normalized.starts_with(base_norm) {
            return Some(normalized);
        }
        return None;
    }

    if href.starts_with('/') {
        if !href.starts_with(base.path()) {
            return None;
        }
        return base.join(href).ok().map(|u| normalize_url(&u));
    }

    // Pure relative reference: resolve against the base, keep only links
    // that stay under it.
    let resolved = base.join(href).ok()?;
    let normalized = normalize_url(&resolved);
    if normalized.starts_with(base_norm) {
        Some(normalized)
    } else {
        None
    }
}

/// Normalized origin + path: scheme, host, optional port, path. Query and
/// fragment are dropped so anchors do not multiply the frontier.
fn normalize_url(url: &Url) -> String {
    let mut normalized = format!("{}://", url.scheme());
    if let Some(host) = url.host_str() {
        normalized.push_str(host);
    }
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{}", port));
    }
    normalized.push_str(url.path());
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> (Url, String) {
        let url = Url::parse("https://docs.example.com/guide/").unwrap();
        let norm = normalize_url(&url);
        (url, norm)
    }

    #[test]
    fn sitemap_url_detection() {
        assert!(is_sitemap_url("https://x.com/sitemap.xml"));
        assert!(is_sitemap_url("https://x.com/sitemap_index.xml"));
        assert!(is_sitemap_url("https://x.com/pages.xml"));
        assert!(!is_sitemap_url("https://x.com/docs"));
        assert!(!is_sitemap_url("https://x.com/"));
    }

    #[test]
    fn sitemap_parse_collects_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://x.com/a</loc></url>
              <url><loc> https://x.com/b </loc></url>
            </urlset>"#;
        assert_eq!(
            parse_sitemap_urls(xml),
            vec!["https://x.com/a".to_string(), "https://x.com/b".to_string()]
        );
    }

    #[test]
    fn extract_links_in_document_order() {
        let html = r#"<html><body>
            <a href="/guide/one">one</a>
            <p><a href="two.html">two</a></p>
            <a>no href</a>
        </body></html>"#;
        assert_eq!(extract_links(html), vec!["/guide/one", "two.html"]);
    }

    #[test]
    fn absolute_links_scoped_to_base_prefix() {
        let (url, norm) = base();
        assert_eq!(
            scope_link(&url, &norm, "https://docs.example.com/guide/intro"),
            Some("https://docs.example.com/guide/intro".to_string())
        );
        assert_eq!(scope_link(&url, &norm, "https://other.example.com/guide/"), None);
        assert_eq!(scope_link(&url, &norm, "https://docs.example.com/blog/"), None);
    }

    #[test]
    fn root_relative_links_need_base_path_prefix() {
        let (url, norm) = base();
        assert_eq!(
            scope_link(&url, &norm, "/guide/setup"),
            Some("https://docs.example.com/guide/setup".to_string())
        );
        assert_eq!(scope_link(&url, &norm, "/pricing"), None);
    }

    #[test]
    fn pure_relative_links_resolve_against_base() {
        let (url, norm) = base();
        assert_eq!(
            scope_link(&url, &norm, "install.html"),
            Some("https://docs.example.com/guide/install.html".to_string())
        );
    }

    #[test]
    fn scheme_prefixed_non_http_links_excluded() {
        let (url, norm) = base();
        assert_eq!(scope_link(&url, &norm, "mailto:team@example.com"), None);
        assert_eq!(scope_link(&url, &norm, "tel:+15551234"), None);
        assert_eq!(scope_link(&url, &norm, "javascript:void(0)"), None);
    }

    #[test]
    fn fragments_and_queries_are_dropped() {
        let (url, norm) = base();
        assert_eq!(scope_link(&url, &norm, "#section"), None);
        assert_eq!(
            scope_link(&url, &norm, "https://docs.example.com/guide/page?tab=2#top"),
            Some("https://docs.example.com/guide/page".to_string())
        );
    }
}
