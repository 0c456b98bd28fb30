//! Reddit content fetching.
//!
//! Reddit rate-limits and blocks naive scraping, so retrieval runs three
//! ordered strategies, falling through on any failure:
//!
//! 1. OAuth API (`oauth.reddit.com`) when client credentials are configured,
//!    using an application-only client-credentials token cached in process
//!    memory and refreshed 60 seconds before its stated expiry.
//! 2. The old-interface `.json` endpoint with a browser User-Agent.
//! 3. Old-interface HTML scraping.
//!
//! Intermediate failures are swallowed (logged at debug); only when all
//! three strategies exhaust does the caller see an error-flagged result,
//! which distinguishes "fetched but could not extract" from "fetch itself
//! failed" and carries the HTTP status when one was seen.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::extract::element_text;
use crate::extract::metadata::PageMetadata;
use crate::fetch::{build_client, document_title, FetchResult};
use crate::normalize::{collapse_newlines, truncate};
use crate::platform::Platform;

const REDDIT_USER_AGENT: &str = "linklore/0.1 (content agent)";
const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Automated moderator account whose comments are never included.
const AUTOMODERATOR: &str = "AutoModerator";

/// Top-level comments kept when scraping HTML.
const MAX_HTML_COMMENTS: usize = 30;
/// Nested replies kept per comment when parsing the JSON API.
const MAX_REPLIES: usize = 3;

static REDDIT_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://(www\.|old\.|new\.)?reddit\.com").expect("valid regex"));

/// Application-only OAuth credential pair (one per process).
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Parsed thread content, shared by all three strategy parsers.
struct ParsedThread {
    title: String,
    content: String,
    metadata: PageMetadata,
}

/// Multi-strategy Reddit fetcher.
pub struct RedditFetcher {
    client: reqwest::Client,
    credentials: Option<RedditCredentials>,
    token: Mutex<Option<CachedToken>>,
    token_url: String,
    api_base: String,
    old_base: String,
}

impl RedditFetcher {
    pub fn new(credentials: Option<RedditCredentials>) -> Result<Self> {
        Ok(Self {
            client: build_client(FETCH_TIMEOUT)?,
            credentials,
            token: Mutex::new(None),
            token_url: "https://www.reddit.com/api/v1/access_token".to_string(),
            api_base: "https://oauth.reddit.com".to_string(),
            old_base: "https://old.reddit.com".to_string(),
        })
    }

    /// Point the fetcher at alternate hosts. Intended for tests.
    #[doc(hidden)]
    pub fn with_hosts(mut self, token_url: &str, api_base: &str, old_base: &str) -> Self {
        self.token_url = token_url.to_string();
        self.api_base = api_base.to_string();
        self.old_base = old_base.to_string();
        self
    }

    /// Fetch a Reddit URL through the strategy chain.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let path = api_path(url);

        if let Some(thread) = self.try_oauth_api(&path, url).await {
            return finish(url, thread);
        }
        if let Some(thread) = self.try_public_json(&path, url).await {
            return finish(url, thread);
        }
        self.scrape_html(url).await
    }

    /// Strategy 1: authenticated API. Any failure falls through silently.
    async fn try_oauth_api(&self, path: &str, url: &str) -> Option<ParsedThread> {
        self.credentials.as_ref()?;
        match self.oauth_api(path, url).await {
            Ok(thread) if !thread.content.trim().is_empty() => Some(thread),
            Ok(_) => {
                debug!("OAuth API returned empty content, falling through");
                None
            }
            Err(e) => {
                debug!("OAuth API strategy failed: {e:#}");
                None
            }
        }
    }

    async fn oauth_api(&self, path: &str, url: &str) -> Result<ParsedThread> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .header(reqwest::header::USER_AGENT, REDDIT_USER_AGENT)
            .send()
            .await
            .context("OAuth API request failed")?;

        if response.status() != reqwest::StatusCode::OK {
            bail!("OAuth API returned HTTP {}", response.status().as_u16());
        }
        let listings: ListingResponse =
            response.json().await.context("invalid OAuth API response")?;
        Ok(parse_listings(&listings, url))
    }

    /// Get (or reuse) the application-only access token. Refreshed 60 s
    /// before its stated lifetime; single global slot, one credential pair
    /// per process.
    async fn access_token(&self) -> Result<String> {
        let creds = self
            .credentials
            .as_ref()
            .context("no Reddit credentials configured")?;

        let mut slot = self.token.lock().await;
        if let Some(cached) = slot.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header(reqwest::header::USER_AGENT, REDDIT_USER_AGENT)
            .form(&[("grant_type", "client_credentials")])
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await
            .context("token request failed")?;

        if response.status() != reqwest::StatusCode::OK {
            bail!("Reddit OAuth failed: HTTP {}", response.status().as_u16());
        }
        let body: TokenResponse = response.json().await.context("invalid token response")?;
        let lifetime = Duration::from_secs(body.expires_in.saturating_sub(60));
        let token = body.access_token.clone();
        *slot = Some(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    /// Strategy 2: public `.json` endpoint on the old-interface host. The
    /// response must declare a JSON content type before parsing is attempted.
    async fn try_public_json(&self, path: &str, url: &str) -> Option<ParsedThread> {
        match self.public_json(path, url).await {
            Ok(thread) if !thread.content.trim().is_empty() => Some(thread),
            Ok(_) => {
                debug!("Public JSON returned empty content, falling through");
                None
            }
            Err(e) => {
                debug!("Public JSON strategy failed: {e:#}");
                None
            }
        }
    }

    async fn public_json(&self, path: &str, url: &str) -> Result<ParsedThread> {
        let json_url = format!("{}{path}.json", self.old_base);
        let response = self
            .client
            .get(&json_url)
            .send()
            .await
            .context("public JSON request failed")?;

        if response.status() != reqwest::StatusCode::OK {
            bail!("public JSON returned HTTP {}", response.status().as_u16());
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.contains("json") {
            bail!("public endpoint declared content type {content_type:?}");
        }

        let body = response.text().await.context("reading public JSON body")?;
        let listings: ListingResponse =
            serde_json::from_str(&body).context("invalid public JSON response")?;
        Ok(parse_listings(&listings, url))
    }

    /// Strategy 3: HTML scraping of the old interface. This is the last
    /// resort, so its failures become the caller-visible error result.
    async fn scrape_html(&self, url: &str) -> FetchResult {
        let old_url = to_old_interface(url, &self.old_base);
        let response = match self.client.get(&old_url).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return FetchResult::failure(url, Platform::Reddit, "Reddit request timed out")
            }
            Err(e) => {
                return FetchResult::failure(url, Platform::Reddit, format!("Reddit fetch error: {e}"))
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return FetchResult::failure(
                url,
                Platform::Reddit,
                format!(
                    "Reddit returned HTTP {}. The post may be private, deleted, \
                     or Reddit is blocking requests.",
                    status.as_u16()
                ),
            );
        }

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return FetchResult::failure(url, Platform::Reddit, format!("Reddit fetch error: {e}"))
            }
        };

        let thread = parse_thread_html(&html);
        if thread.content.trim().is_empty() {
            return FetchResult::failure(
                url,
                Platform::Reddit,
                "Fetched Reddit page but could not extract content. \
                 The post may be deleted or require login.",
            );
        }
        finish(url, thread)
    }
}

/// Assemble the final result, applying the shared content ceiling.
fn finish(url: &str, thread: ParsedThread) -> FetchResult {
    FetchResult {
        url: url.to_string(),
        title: thread.title,
        content: truncate(&thread.content),
        platform: Platform::Reddit,
        metadata: thread.metadata,
        error: false,
    }
}

/// Reduce a Reddit URL to its API path (`/r/<sub>/comments/<id>/...`):
/// strip the host, query string, trailing slash, and any `.json` suffix.
fn api_path(url: &str) -> String {
    let stripped = REDDIT_HOST.replace(url, "");
    let stripped = stripped.split('?').next().unwrap_or_default();
    let stripped = stripped.trim_end_matches('/');
    let stripped = stripped.strip_suffix(".json").unwrap_or(stripped);
    if stripped.is_empty() {
        "/".to_string()
    } else {
        stripped.to_string()
    }
}

/// Rewrite any reddit URL onto the old-interface host.
fn to_old_interface(url: &str, old_base: &str) -> String {
    REDDIT_HOST.replace(url, old_base).into_owned()
}

// ============================================================================
// JSON API parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: u64,
}

fn default_token_lifetime() -> u64 {
    3600
}

/// The API returns thread pages as a two-listing array and most other
/// endpoints as a single listing object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListingResponse {
    Many(Vec<Listing>),
    One(Listing),
}

impl ListingResponse {
    fn listings(&self) -> &[Listing] {
        match self {
            ListingResponse::Many(listings) => listings,
            ListingResponse::One(listing) => std::slice::from_ref(listing),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
struct ThingData {
    // Post fields (kind "t3")
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subreddit_name_prefixed: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: String,
    // Comment fields (kind "t1")
    #[serde(default)]
    body: String,
    /// Either a nested listing or an empty string when there are no replies.
    #[serde(default)]
    replies: Replies,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Replies {
    Listing(Box<Listing>),
    // The string value is only a deserialization target; "" means no replies.
    Empty(#[allow(dead_code)] String),
}

impl Default for Replies {
    fn default() -> Self {
        Replies::Empty(String::new())
    }
}

/// Flatten listings into plain text: the post (title, author line, selftext,
/// outbound link) followed by comments with up to [`MAX_REPLIES`] indented
/// replies each. `AutoModerator` is excluded everywhere.
fn parse_listings(response: &ListingResponse, url: &str) -> ParsedThread {
    let mut parts: Vec<String> = Vec::new();
    let mut title = String::new();
    let mut metadata = PageMetadata::default();

    for listing in response.listings() {
        for child in &listing.data.children {
            match child.kind.as_str() {
                "t3" => {
                    let post = &child.data;
                    title = post.title.clone();
                    metadata = PageMetadata {
                        author: Some(format!("u/{}", post.author)),
                        date: timestamp_iso(post.created_utc),
                        description: Some(format!(
                            "{} | Score: {}",
                            post.subreddit_name_prefixed, post.score
                        )),
                    };

                    parts.push(format!("POST: {}", post.title));
                    parts.push(format!(
                        "Author: u/{} | {} | Score: {}",
                        post.author, post.subreddit_name_prefixed, post.score
                    ));
                    if !post.selftext.is_empty() {
                        parts.push(format!("\n{}", post.selftext));
                    }
                    if !post.url.is_empty() && post.url != url && !post.url.contains("reddit.com") {
                        parts.push(format!("\nLinked URL: {}", post.url));
                    }
                    parts.push(String::new());
                }
                "t1" => {
                    let comment = &child.data;
                    if comment.body.is_empty() || comment.author == AUTOMODERATOR {
                        continue;
                    }
                    let author = display_author(&comment.author);
                    parts.push(format!("[u/{author} | {} pts]", comment.score));
                    parts.push(comment.body.clone());
                    parts.push(String::new());

                    if let Replies::Listing(replies) = &comment.replies {
                        for reply in replies.data.children.iter().take(MAX_REPLIES) {
                            let r = &reply.data;
                            if r.body.is_empty() || r.author.is_empty() || r.author == AUTOMODERATOR
                            {
                                continue;
                            }
                            parts.push(format!("  [u/{} | {} pts]", r.author, r.score));
                            parts.push(format!("  {}", r.body));
                            parts.push(String::new());
                        }
                    }
                }
                _ => {}
            }
        }
    }

    ParsedThread {
        title,
        content: parts.join("\n"),
        metadata,
    }
}

fn display_author(author: &str) -> &str {
    if author.is_empty() {
        "[deleted]"
    } else {
        author
    }
}

#[allow(clippy::cast_possible_truncation)]
fn timestamp_iso(created_utc: f64) -> Option<String> {
    if created_utc <= 0.0 {
        return None;
    }
    DateTime::from_timestamp(created_utc as i64, 0).map(|dt| dt.to_rfc3339())
}

// ============================================================================
// HTML scraping
// ============================================================================

static TITLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a.title").expect("valid selector"));
static USERTEXT: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".usertext-body").expect("valid selector"));
static COMMENT: Lazy<Selector> = Lazy::new(|| Selector::parse(".comment").expect("valid selector"));
static AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse(".author").expect("valid selector"));
static SCORE: Lazy<Selector> = Lazy::new(|| Selector::parse(".score").expect("valid selector"));
static META_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static SITETABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".sitetable").expect("valid selector"));
static ROLE_MAIN: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"[role="main"]"#).expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Extract post, selftext, and up to [`MAX_HTML_COMMENTS`] top-level comments
/// from an old-interface HTML page. When no structured markers exist at all,
/// falls back to the page's main content region as raw text.
fn parse_thread_html(html: &str) -> ParsedThread {
    let doc = Html::parse_document(html);
    let mut title = document_title(&doc);
    let mut parts: Vec<String> = Vec::new();

    if let Some(link) = doc.select(&TITLE_LINK).next() {
        let post_title = element_text(link);
        parts.push(format!("POST: {post_title}"));
        if title.is_empty() {
            title = post_title;
        }
    }

    if let Some(selftext) = doc.select(&USERTEXT).next() {
        parts.push(element_text(selftext));
        parts.push(String::new());
    }

    for comment in doc.select(&COMMENT).take(MAX_HTML_COMMENTS) {
        let author = comment
            .select(&AUTHOR)
            .next()
            .map(|el| element_text(el).trim().to_string())
            .unwrap_or_else(|| "[deleted]".to_string());
        if author == AUTOMODERATOR {
            continue;
        }
        let Some(body) = comment.select(&USERTEXT).next() else {
            continue;
        };
        let score = comment
            .select(&SCORE)
            .next()
            .and_then(|el| el.value().attr("title").map(ToString::to_string))
            .unwrap_or_default();
        if score.is_empty() {
            parts.push(format!("[u/{author}]"));
        } else {
            parts.push(format!("[u/{author} | {score} pts]"));
        }
        parts.push(element_text(body));
        parts.push(String::new());
    }

    if parts.is_empty() {
        let main = doc
            .select(&SITETABLE)
            .next()
            .or_else(|| doc.select(&ROLE_MAIN).next())
            .or_else(|| doc.select(&BODY).next());
        if let Some(main) = main {
            parts.push(element_text(main));
        }
    }

    let metadata = PageMetadata {
        author: None,
        date: None,
        description: doc
            .select(&META_DESCRIPTION)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(ToString::to_string),
    };

    ParsedThread {
        title,
        content: collapse_newlines(&parts.join("\n")),
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_path_strips_host_query_and_suffix() {
        assert_eq!(
            api_path("https://www.reddit.com/r/rust/comments/abc123/title/?utm_source=x"),
            "/r/rust/comments/abc123/title"
        );
        assert_eq!(
            api_path("https://old.reddit.com/r/rust/comments/abc123.json"),
            "/r/rust/comments/abc123"
        );
        assert_eq!(api_path("https://reddit.com/"), "/");
    }

    #[test]
    fn old_interface_rewrite() {
        assert_eq!(
            to_old_interface("https://www.reddit.com/r/rust/comments/x", "https://old.reddit.com"),
            "https://old.reddit.com/r/rust/comments/x"
        );
    }

    #[test]
    fn parses_array_shaped_listing_with_post_and_comments() {
        let json = r#"[
            {"data": {"children": [
                {"kind": "t3", "data": {
                    "title": "Interesting thread",
                    "author": "asker",
                    "subreddit_name_prefixed": "r/rust",
                    "score": 42,
                    "created_utc": 1700000000.0,
                    "selftext": "What do you think?",
                    "url": "https://example.com/linked"
                }}
            ]}},
            {"data": {"children": [
                {"kind": "t1", "data": {"author": "helper", "score": 7, "body": "Great question.",
                    "replies": {"data": {"children": [
                        {"kind": "t1", "data": {"author": "nested", "score": 2, "body": "Agreed."}},
                        {"kind": "t1", "data": {"author": "AutoModerator", "score": 1, "body": "I am a bot."}}
                    ]}}
                }},
                {"kind": "t1", "data": {"author": "AutoModerator", "score": 1, "body": "Welcome!"}}
            ]}}
        ]"#;
        let response: ListingResponse = serde_json::from_str(json).unwrap();
        let thread = parse_listings(&response, "https://reddit.com/r/rust/comments/abc");

        assert_eq!(thread.title, "Interesting thread");
        assert!(thread.content.contains("POST: Interesting thread"));
        assert!(thread.content.contains("What do you think?"));
        assert!(thread.content.contains("Linked URL: https://example.com/linked"));
        assert!(thread.content.contains("[u/helper | 7 pts]"));
        assert!(thread.content.contains("  [u/nested | 2 pts]"));
        assert!(!thread.content.contains("AutoModerator"));
        assert!(!thread.content.contains("I am a bot"));
        assert_eq!(thread.metadata.author.as_deref(), Some("u/asker"));
        assert_eq!(thread.metadata.description.as_deref(), Some("r/rust | Score: 42"));
        assert!(thread.metadata.date.as_deref().unwrap().starts_with("2023-11-14"));
    }

    #[test]
    fn parses_single_object_listing() {
        let json = r#"{"data": {"children": [
            {"kind": "t3", "data": {"title": "Solo", "author": "a", "subreddit_name_prefixed": "r/x",
                "score": 1, "selftext": "body", "url": ""}}
        ]}}"#;
        let response: ListingResponse = serde_json::from_str(json).unwrap();
        let thread = parse_listings(&response, "https://reddit.com/r/x");
        assert_eq!(thread.title, "Solo");
        assert!(thread.content.contains("body"));
    }

    #[test]
    fn comment_replies_as_empty_string_parse() {
        let json = r#"{"data": {"children": [
            {"kind": "t1", "data": {"author": "c", "score": 3, "body": "no replies", "replies": ""}}
        ]}}"#;
        let response: ListingResponse = serde_json::from_str(json).unwrap();
        let thread = parse_listings(&response, "https://reddit.com/r/x");
        assert!(thread.content.contains("no replies"));
    }

    #[test]
    fn html_scrape_extracts_post_and_skips_automoderator() {
        let html = r#"<html><head><title>r/rust thread</title>
            <meta name="description" content="A discussion.">
        </head><body>
            <a class="title" href="/r/rust/comments/abc">Borrow checker tips</a>
            <div class="usertext-body"><p>Original post body.</p></div>
            <div class="comment">
                <a class="author">AutoModerator</a>
                <div class="usertext-body"><p>This is an automated message.</p></div>
            </div>
            <div class="comment">
                <a class="author">rustacean</a>
                <span class="score" title="12">12 points</span>
                <div class="usertext-body"><p>Use lifetimes sparingly.</p></div>
            </div>
        </body></html>"#;

        let thread = parse_thread_html(html);
        assert!(thread.content.contains("POST: Borrow checker tips"));
        assert!(thread.content.contains("Original post body."));
        assert!(thread.content.contains("[u/rustacean | 12 pts]"));
        assert!(thread.content.contains("Use lifetimes sparingly."));
        assert!(!thread.content.contains("automated message"));
        assert_eq!(thread.metadata.description.as_deref(), Some("A discussion."));
    }

    #[test]
    fn html_scrape_falls_back_to_main_region() {
        let html = r#"<html><body><div role="main"><p>Only raw text here.</p></div></body></html>"#;
        let thread = parse_thread_html(html);
        assert!(thread.content.contains("Only raw text here."));
    }

    #[test]
    fn html_scrape_of_empty_page_yields_empty_content() {
        let thread = parse_thread_html("<html><body></body></html>");
        assert!(thread.content.trim().is_empty());
    }
}
