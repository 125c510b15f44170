use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};

/// Source of page and data documents for the resolver.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a document as text. Non-success statuses are errors.
    async fn fetch_text(&self, url: &str) -> ResolverResult<String>;

    /// Fetch and decode a JSON document.
    async fn fetch_json(&self, url: &str) -> ResolverResult<Value> {
        let text = self.fetch_text(url).await?;
        serde_json::from_str(&text)
            .map_err(|e| ResolverError::ParseFailed(format!("{url}: {e}")))
    }
}

/// reqwest-backed fetcher presenting itself as a desktop browser.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ResolverConfig) -> ResolverResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.5"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ResolverError::Config(format!("user agent: {e}")))?,
        );

        let mut builder = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| ResolverError::Config(format!("proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| ResolverError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> ResolverResult<String> {
        debug!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolverError::fetch(url, e))?;
        response.text().await.map_err(|e| ResolverError::fetch(url, e))
    }
}

/// Fetcher serving fixed documents from memory.
///
/// Used to replay captured page snapshots. Unknown URLs fail like a 404.
#[derive(Debug, Default)]
pub struct SnapshotFetcher {
    documents: HashMap<String, String>,
    requests: AtomicUsize,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    /// Number of fetches served or refused so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PageFetcher for SnapshotFetcher {
    async fn fetch_text(&self, url: &str) -> ResolverResult<String> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| ResolverError::fetch(url, "404 Not Found"))
    }
}
