//! `linklore` - Chat link agent: fetch, extract, analyze
//!
//! # Features
//!
//! - **Platform-aware extraction**: Substack, beehiiv, Ghost, Mailchimp,
//!   Medium, Reddit and other platforms each get a tuned extractor with a
//!   general-article fallback
//! - **Reddit strategy chain**: OAuth API, then the public JSON endpoint,
//!   then an HTML scrape of `old.reddit.com`
//! - **Content library**: named collections plus a bounded fetch history,
//!   persisted as a single JSON file
//! - **AI analysis**: summaries, research digests, trend and brand
//!   perception reports via the Gemini API
//!
//! # Example
//!
//! ```rust,no_run
//! use linklore::agent::LinkAgent;
//! use linklore::config::AgentConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AgentConfig::load()?;
//!     let agent = LinkAgent::new(&config)?;
//!     let result = agent.fetch_url("https://example.com/post").await;
//!     println!("{}: {} chars", result.title, result.content.len());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cache;
pub mod command;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod genai;
pub mod library;
pub mod normalize;
pub mod platform;
pub mod prompt;
pub mod reddit;

pub use agent::{chunk_message, LinkAgent, HELP_TEXT, MESSAGE_CEILING};
pub use cache::ChannelCache;
pub use command::{parse_message, Command, ParsedMessage};
pub use config::AgentConfig;
pub use fetch::{FetchResult, Fetcher};
pub use genai::{GeminiClient, ModelError, TextModel};
pub use library::{LibraryStore, SourceDoc};
pub use normalize::{normalize, CONTENT_CEILING};
pub use platform::{detect_platform, Platform};
pub use reddit::{RedditCredentials, RedditFetcher};

/// Version of linklore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
