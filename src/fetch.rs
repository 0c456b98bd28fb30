//! URL fetching and extractor dispatch.
//!
//! [`Fetcher`] is the single entry point of the pipeline: it routes
//! discussion-site URLs to the [`crate::reddit`] multi-strategy fetcher and
//! everything else through one HTTP GET with a browser User-Agent, redirect
//! following, and relaxed TLS verification (a read-only extraction tradeoff,
//! not for anything security-sensitive).
//!
//! Failures are data: every path returns a well-formed [`FetchResult`], with
//! `error = true` and a human-readable diagnostic in `content` when the
//! fetch or extraction went wrong.

use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::extract::metadata::PageMetadata;
use crate::extract::{element_text, extract_content};
use crate::normalize::normalize;
use crate::platform::{detect_platform, is_reddit_domain, Platform};
use crate::reddit::RedditFetcher;

/// Browser-like User-Agent used for all generic page fetches.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalized output of retrieving and extracting one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    /// Page title; empty when the document has none.
    #[serde(default)]
    pub title: String,
    /// Normalized plain text, or a diagnostic when `error` is set.
    pub content: String,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "PageMetadata::is_empty")]
    pub metadata: PageMetadata,
    /// When true the result must not be cached or persisted as content.
    #[serde(default)]
    pub error: bool,
}

impl FetchResult {
    /// An error-flagged result whose content is a human-readable diagnostic.
    pub fn failure(url: &str, platform: Platform, diagnostic: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            title: String::new(),
            content: diagnostic.into(),
            platform,
            metadata: PageMetadata::default(),
            error: true,
        }
    }
}

/// Shared browser-like headers for unauthenticated fetches.
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers
}

/// Build the shared HTTP client used by the generic and fallback paths.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_headers())
        .use_rustls_tls()
        // Read-only content extraction: expired/self-signed certs on blog
        // hosts should not abort the pipeline.
        .danger_accept_invalid_certs(true)
        .brotli(true)
        .gzip(true)
        .deflate(true)
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Fetches URLs and dispatches them through the extraction pipeline.
pub struct Fetcher {
    client: reqwest::Client,
    reddit: RedditFetcher,
}

impl Fetcher {
    pub fn new(reddit: RedditFetcher) -> Result<Self> {
        Ok(Self {
            client: build_client(FETCH_TIMEOUT)?,
            reddit,
        })
    }

    /// Fetch a URL, detect its platform, and extract content + metadata.
    ///
    /// Never returns `Err`: network and extraction failures come back as
    /// error-flagged results so callers always have a value to branch on.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_url(&self, url: &str) -> FetchResult {
        let domain = match url::Url::parse(url) {
            Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
            Err(e) => return FetchResult::failure(url, Platform::General, format!("Invalid URL: {e}")),
        };

        // Reddit rate-limits naive scraping; it gets its own strategy chain.
        if is_reddit_domain(&domain) {
            return self.reddit.fetch(url).await;
        }

        debug!("Fetching page");
        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return FetchResult::failure(url, Platform::General, "Request timed out")
            }
            Err(e) => {
                return FetchResult::failure(url, Platform::General, format!("Fetch error: {e}"))
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return FetchResult::failure(url, Platform::General, format!("HTTP {}", status.as_u16()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::failure(url, Platform::General, format!("Fetch error: {e}"))
            }
        };

        let result = extract_page(url, &domain, &body);
        info!(
            platform = %result.platform,
            content_len = result.content.len(),
            "Extraction complete"
        );
        result
    }
}

/// Parse fetched HTML and run platform detection + extraction. Synchronous;
/// the parsed DOM never crosses an await point.
fn extract_page(url: &str, domain: &str, body: &str) -> FetchResult {
    let doc = Html::parse_document(body);

    let platform = detect_platform(domain, &doc);
    let title = document_title(&doc);
    let content = normalize(&extract_content(platform, &doc));
    let metadata = PageMetadata::extract(&doc);

    FetchResult {
        url: url.to_string(),
        title,
        content,
        platform,
        metadata,
        error: false,
    }
}

/// The `<title>` text, or empty when absent/blank.
pub fn document_title(doc: &Html) -> String {
    static TITLE: once_cell::sync::Lazy<Selector> =
        once_cell::sync::Lazy::new(|| Selector::parse("title").expect("valid selector"));
    doc.select(&TITLE)
        .next()
        .map(|el| element_text(el).trim().to_string())
        .unwrap_or_default()
}
