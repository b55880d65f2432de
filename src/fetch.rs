//! Page fetching for website sources.
//!
//! The fetch strategy is pluggable: the standard fetcher is a plain HTTP
//! GET, while teams entitled to the higher-fidelity renderer plug in their
//! own [`PageFetcher`]. The per-source renderer flag travels with every
//! fetch so one fetcher can serve both strategies. A failed fetch yields
//! `None` ("no content"), never an error.

use async_trait::async_trait;

/// Fetches the raw HTML for one page URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns the page body, or `None` when the page cannot be fetched.
    /// `high_fidelity` asks for the rendered page when the implementation
    /// has a renderer; implementations without one serve the plain body.
    async fn fetch(&self, url: &str, high_fidelity: bool) -> Option<String>;
}

/// Standard fetcher: plain HTTP GET with a browser-ish timeout. Has no
/// renderer, so a high-fidelity request degrades to the plain body.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("corpus-sync/0.3")
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, high_fidelity: bool) -> Option<String> {
        if high_fidelity {
            tracing::debug!("no renderer available, plain fetch for {}", url);
        }

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!("page fetch failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("page fetch for {} returned {}", url, response.status());
            return None;
        }

        response.text().await.ok()
    }
}
