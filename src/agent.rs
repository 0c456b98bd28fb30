//! Message-handling orchestration.
//!
//! Ties the pipeline together: parse → fetch → extract → cache/record →
//! prompt → generate → reply. Every failure path ends in a chat-visible
//! message; nothing here panics or aborts the process over a single
//! request. Replies are chunked to the platform's per-message ceiling.

use anyhow::Result;
use tracing::{error, info};

use crate::cache::ChannelCache;
use crate::command::{parse_message, Command};
use crate::config::AgentConfig;
use crate::fetch::{FetchResult, Fetcher};
use crate::genai::{GeminiClient, TextModel};
use crate::library::{LibraryStore, SourceDoc};
use crate::normalize::char_prefix;
use crate::platform::Platform;
use crate::prompt;
use crate::reddit::RedditFetcher;

/// Per-message character ceiling of the chat platform.
pub const MESSAGE_CEILING: usize = 2000;
/// Below this position a newline split is not worth it; hard-cut instead.
const MIN_SPLIT: usize = 1000;

/// Characters of raw content shown by the `!extract` command.
const EXTRACT_DISPLAY_CHARS: usize = 3500;
/// History entries shown by `!history`.
const HISTORY_DISPLAY: usize = 15;
/// Content prefix searched for trend topics.
const TREND_SEARCH_CHARS: usize = 2000;
/// Content prefix searched for brand mentions.
const BRAND_SEARCH_CHARS: usize = 3000;

pub const HELP_TEXT: &str = "**Link Agent Commands**

**URL Processing** — paste a URL or use a command:
`!summarize <url>` — Quick summary of the page
`!research <url>` — Deep analysis with key takeaways
`!article <url>` — Draft an article based on the content
`!code <url>` — Extract code-relevant insights and ideas
`!extract <url>` — Show the raw extracted text (no AI)
`!newsletter <url>` — Extract & summarize newsletter content

**Trend & Brand Analysis:**
`!trend <topic>` — Analyze trends from your collected content on a topic
`!brand <brand_name>` — Brand perception analysis across collected content
`!brand <brand_name> <url>` — Analyze how a specific page portrays a brand

**Content Library:**
`!collect <name> <url>` — Save a URL's content to a named collection
`!library` — List all collections
`!library <name>` — Show contents of a collection
`!analyze <name>` — Deep cross-source analysis of a collection
`!clear <name>` — Delete a collection

**Utility:**
`!history` — Show recently fetched URLs
`!status` — Cached content info for this channel
`!help` — Show this message

**Follow-up:** After any URL, just send a message to continue the conversation about it.";

/// Split an outbound reply into platform-sized messages, preferring the
/// last newline before the ceiling and hard-cutting only when no newline
/// exists past the halfway mark.
pub fn chunk_message(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= MESSAGE_CEILING {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = &chars[..];
    while rest.len() > MESSAGE_CEILING {
        let window = &rest[..MESSAGE_CEILING];
        let split_at = window
            .iter()
            .rposition(|c| *c == '\n')
            .filter(|i| *i >= MIN_SPLIT)
            .unwrap_or(MESSAGE_CEILING);
        chunks.push(window[..split_at].iter().collect());
        rest = &rest[split_at..];
        while rest.first() == Some(&'\n') {
            rest = &rest[1..];
        }
    }
    if !rest.is_empty() {
        chunks.push(rest.iter().collect());
    }
    chunks
}

/// The chat agent: owns the pipeline, the caches, and the model boundary.
pub struct LinkAgent {
    fetcher: Fetcher,
    store: LibraryStore,
    channels: ChannelCache,
    model: Option<Box<dyn TextModel>>,
}

impl LinkAgent {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let model: Option<Box<dyn TextModel>> = config
            .gemini_api_key
            .as_ref()
            .map(|key| Box::new(GeminiClient::new(key, &config.model)) as Box<dyn TextModel>);
        Self::with_model(config, model)
    }

    /// Build with an explicit (or absent) model. Seam for tests.
    pub fn with_model(config: &AgentConfig, model: Option<Box<dyn TextModel>>) -> Result<Self> {
        let reddit = RedditFetcher::new(config.reddit.clone())?;
        Ok(Self {
            fetcher: Fetcher::new(reddit)?,
            store: LibraryStore::open(config.library_file()),
            channels: ChannelCache::new(),
            model,
        })
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub fn channels(&self) -> &ChannelCache {
        &self.channels
    }

    /// One-line summary for startup logging.
    pub fn startup_summary(&self) -> String {
        format!(
            "Library: {} collections, {} history entries",
            self.store.collections_len(),
            self.store.history_len()
        )
    }

    /// Fetch a URL through the full pipeline.
    pub async fn fetch_url(&self, url: &str) -> FetchResult {
        self.fetcher.fetch_url(url).await
    }

    /// Handle one inbound message on a channel. Returns the outbound
    /// messages, already chunked to the platform ceiling.
    pub async fn handle_message(&self, channel: &str, sender: &str, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let parsed = parse_message(text);
        let reply = match parsed.command {
            Some(Command::Help) => HELP_TEXT.to_string(),
            Some(Command::Status) => self.status_reply(channel),
            Some(Command::History) => self.history_reply(),
            Some(Command::Library) => self.library_reply(&parsed.extra),
            Some(Command::Clear) => self.clear_reply(&parsed.extra),
            Some(Command::Trend) => self.trend_reply(&parsed.extra).await,
            Some(Command::Analyze) => self.analyze_reply(&parsed.extra).await,
            Some(Command::Brand) => {
                self.brand_reply(channel, &parsed.extra, parsed.url.as_deref())
                    .await
            }
            Some(Command::Collect) => {
                self.collect_reply(channel, &parsed.extra, parsed.url.as_deref())
                    .await
            }
            Some(command) => match parsed.url.as_deref() {
                Some(url) => {
                    info!(%sender, command = command.name(), %url, "URL command");
                    self.url_command_reply(channel, command, url, &parsed.extra)
                        .await
                }
                None => format!("Usage: `!{} <url>`", command.name()),
            },
            None => self.freeform_reply(channel, sender, text).await,
        };

        chunk_message(&reply)
    }

    // --- URL commands -----------------------------------------------------

    async fn url_command_reply(
        &self,
        channel: &str,
        command: Command,
        url: &str,
        extra: &str,
    ) -> String {
        let result = self.fetch_url(url).await;
        if result.error {
            return format!("Could not fetch <{url}>:\n{}", result.content);
        }
        if result.content.trim().is_empty() {
            return format!(
                "Fetched <{url}> but couldn't extract meaningful text. \
                 The page may require JavaScript or authentication."
            );
        }

        self.remember(channel, &result);

        if command == Command::Extract {
            return extract_display(&result);
        }

        let prompt = prompt::build_prompt(command, &result, extra);
        let generated = self.generate(&prompt).await;
        let title = if result.title.is_empty() {
            result.url.as_str()
        } else {
            result.title.as_str()
        };
        format!(
            "**{}** — {title}{}\n\n{generated}",
            capitalize(command.name()),
            platform_tag(result.platform)
        )
    }

    /// Cache the result for follow-ups and record it in history.
    fn remember(&self, channel: &str, result: &FetchResult) {
        self.channels.put(channel, result);
        if let Err(e) = self.store.record_history(result) {
            error!("Failed to persist history: {e:#}");
        }
    }

    // --- Library commands ---------------------------------------------------

    async fn collect_reply(&self, channel: &str, extra: &str, url: Option<&str>) -> String {
        let (Some(name), Some(url)) = (extra.split_whitespace().next(), url) else {
            return "Usage: `!collect <collection_name> <url>`".to_string();
        };

        let result = self.fetch_url(url).await;
        if result.error {
            return format!("Could not fetch <{url}>: {}", result.content);
        }
        self.remember(channel, &result);
        match self.store.add_to_collection(name, &result) {
            Ok(count) => {
                let title = if result.title.is_empty() {
                    "(no title)"
                } else {
                    result.title.as_str()
                };
                format!(
                    "Added to **{}** (now {count} items){}\nTitle: {title}",
                    name.to_lowercase(),
                    platform_tag(result.platform)
                )
            }
            Err(e) => {
                error!("Failed to save collection item: {e:#}");
                format!("Saved nothing: {e}")
            }
        }
    }

    fn library_reply(&self, extra: &str) -> String {
        if !extra.is_empty() {
            let name = extra.trim().to_lowercase();
            let Some(items) = self.store.collection(&name) else {
                return format!("No collection named **{name}**. Use `!library` to list all.");
            };
            let mut lines = vec![format!("**Collection: {name}** ({} items)\n", items.len())];
            for item in &items {
                let title = if item.title.is_empty() {
                    "Untitled"
                } else {
                    item.title.as_str()
                };
                lines.push(format!(
                    "- `{}` [{title}]({})",
                    item.fetched_at.format("%Y-%m-%d"),
                    item.url
                ));
            }
            return lines.join("\n");
        }

        let summaries = self.store.collection_summaries();
        if summaries.is_empty() {
            return "Library is empty. Use `!collect <name> <url>` to start building collections."
                .to_string();
        }
        let mut lines = vec!["**Content Library:**\n".to_string()];
        for (name, count) in summaries {
            lines.push(format!("- **{name}** — {count} items"));
        }
        lines.push("\nUse `!library <name>` to see details.".to_string());
        lines.join("\n")
    }

    fn clear_reply(&self, extra: &str) -> String {
        if extra.is_empty() {
            return "Usage: `!clear <collection_name>`".to_string();
        }
        let name = extra.trim().to_lowercase();
        match self.store.delete_collection(&name) {
            Ok(true) => format!("Deleted collection **{name}**."),
            Ok(false) => format!("No collection named **{name}**."),
            Err(e) => {
                error!("Failed to delete collection: {e:#}");
                format!("Could not delete **{name}**: {e}")
            }
        }
    }

    fn history_reply(&self) -> String {
        let entries = self.store.recent_history(HISTORY_DISPLAY);
        if entries.is_empty() {
            return "No fetch history yet.".to_string();
        }
        let mut lines = vec!["**Recent fetch history** (newest first):\n".to_string()];
        for entry in entries {
            let label = if entry.title.is_empty() {
                entry.url.clone()
            } else {
                entry.title.clone()
            };
            lines.push(format!(
                "- `{}` {}{}",
                entry.fetched_at.format("%Y-%m-%d"),
                char_prefix(&label, 80),
                platform_tag(entry.platform)
            ));
        }
        lines.join("\n")
    }

    fn status_reply(&self, channel: &str) -> String {
        match self.channels.get(channel) {
            Some(ctx) => {
                let title = if ctx.title.is_empty() {
                    "(no title)"
                } else {
                    ctx.title.as_str()
                };
                format!(
                    "**Cached content for this channel:**\nURL: {}{}\nTitle: {title}\n\
                     Content length: {} characters",
                    ctx.url,
                    platform_tag(ctx.platform),
                    group_digits(ctx.content.chars().count())
                )
            }
            None => "No cached content. Share a URL to get started.".to_string(),
        }
    }

    // --- Corpus analyses ----------------------------------------------------

    async fn trend_reply(&self, topic: &str) -> String {
        if topic.is_empty() {
            return "Usage: `!trend <topic>`\nI'll search your collected content for relevant sources."
                .to_string();
        }
        let sources = self.store.search_by_keyword(topic, TREND_SEARCH_CHARS);
        if sources.is_empty() {
            return format!(
                "No content found related to **{topic}** in your library.\n\
                 Collect some URLs first with `!collect <name> <url>` or share URLs \
                 related to this topic."
            );
        }
        let generated = self.generate(&prompt::build_trend_prompt(topic, &sources)).await;
        format!(
            "**Trend Analysis: {topic}** ({} sources)\n\n{generated}",
            sources.len()
        )
    }

    async fn brand_reply(&self, channel: &str, brand: &str, url: Option<&str>) -> String {
        if brand.is_empty() && url.is_none() {
            return "Usage:\n`!brand <brand_name>` — Analyze perception across all collected content\n\
                    `!brand <brand_name> <url>` — Analyze perception in a specific page"
                .to_string();
        }

        let sources: Vec<SourceDoc> = if let Some(url) = url {
            let result = self.fetch_url(url).await;
            if result.error {
                return format!("Could not fetch <{url}>: {}", result.content);
            }
            self.remember(channel, &result);
            vec![SourceDoc {
                url: result.url.clone(),
                title: result.title.clone(),
                date: result.metadata.date.clone(),
                content: result.content.clone(),
            }]
        } else {
            self.store.search_by_keyword(brand, BRAND_SEARCH_CHARS)
        };

        if sources.is_empty() {
            return format!(
                "No content found mentioning **{brand}**.\n\
                 Try `!brand {brand} <url>` with a specific URL, or collect more content first."
            );
        }
        let generated = self.generate(&prompt::build_brand_prompt(brand, &sources)).await;
        format!(
            "**Brand Perception: {brand}** ({} sources)\n\n{generated}",
            sources.len()
        )
    }

    async fn analyze_reply(&self, name: &str) -> String {
        if name.is_empty() {
            return "Usage: `!analyze <collection_name>`".to_string();
        }
        let name = name.trim().to_lowercase();
        let Some(items) = self.store.collection(&name) else {
            return format!("No collection named **{name}**.");
        };
        let sources: Vec<SourceDoc> = items.iter().map(SourceDoc::from).collect();
        let generated = self
            .generate(&prompt::build_collection_prompt(&name, &sources))
            .await;
        format!(
            "**Collection Analysis: {name}** ({} sources)\n\n{generated}",
            sources.len()
        )
    }

    // --- Follow-up / open chat ----------------------------------------------

    async fn freeform_reply(&self, channel: &str, sender: &str, text: &str) -> String {
        if let Some(cached) = self.channels.get(channel) {
            info!(%sender, url = %cached.url, "Follow-up on cached content");
            return self
                .generate(&prompt::build_followup_prompt(&cached, text))
                .await;
        }
        info!(%sender, "Open-ended chat");
        self.generate(text).await
    }

    /// Call the model, converting failures into a chat-visible message.
    async fn generate(&self, prompt: &str) -> String {
        let Some(model) = &self.model else {
            return "No generative backend configured. Set GEMINI_API_KEY to enable AI commands."
                .to_string();
        };
        match model.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!("Generation failed: {e}");
                format!("Generation error: {e}")
            }
        }
    }
}

/// Raw-extract display: header plus the first [`EXTRACT_DISPLAY_CHARS`] of
/// content; the full text stays cached for follow-ups.
fn extract_display(result: &FetchResult) -> String {
    let title = if result.title.is_empty() {
        "(no title)"
    } else {
        result.title.as_str()
    };
    let mut reply = format!(
        "**Extracted from:** {}{}\n**Title:** {title}\n**Content length:** {} chars\n\n{}",
        result.url,
        platform_tag(result.platform),
        group_digits(result.content.chars().count()),
        char_prefix(&result.content, EXTRACT_DISPLAY_CHARS)
    );
    if result.content.chars().count() > EXTRACT_DISPLAY_CHARS {
        reply.push_str("\n\n*[Truncated — full content cached for follow-up questions]*");
    }
    reply
}

/// ` [platform]` suffix, omitted for general pages.
fn platform_tag(platform: Platform) -> String {
    if platform == Platform::General {
        String::new()
    } else {
        format!(" [{platform}]")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Thousands separator for character counts (e.g. `12,345`).
fn group_digits(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
