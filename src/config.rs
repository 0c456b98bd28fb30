//! Agent configuration.
//!
//! Loaded from `~/.config/linklore/config.toml` when present, with
//! environment variables taking precedence (`GEMINI_API_KEY`,
//! `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET`, `AGENT_DATA_DIR`). A missing
//! config file is not an error — everything has a default or comes from the
//! environment.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::reddit::RedditCredentials;

const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Runtime configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Directory holding the persistent content library.
    pub data_dir: PathBuf,
    /// Generative model identifier.
    pub model: String,
    /// API key for the generative backend; commands needing it fail politely
    /// when absent.
    pub gemini_api_key: Option<String>,
    /// Reddit OAuth credentials; absent means strategy 1 is skipped.
    pub reddit: Option<RedditCredentials>,
}

/// On-disk config file shape. All fields optional.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    model: Option<String>,
    gemini_api_key: Option<String>,
    reddit_client_id: Option<String>,
    reddit_client_secret: Option<String>,
}

impl AgentConfig {
    /// Load from the config file (if any) and the environment.
    pub fn load() -> Result<Self> {
        let file = load_config_file()?;

        let data_dir = env_var("AGENT_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or_else(|| PathBuf::from("./agent_data"));
        let model = env_var("LINKLORE_MODEL")
            .or(file.model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let gemini_api_key = env_var("GEMINI_API_KEY").or(file.gemini_api_key);

        let reddit = match (
            env_var("REDDIT_CLIENT_ID").or(file.reddit_client_id),
            env_var("REDDIT_CLIENT_SECRET").or(file.reddit_client_secret),
        ) {
            (Some(client_id), Some(client_secret)) => Some(RedditCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Ok(Self {
            data_dir,
            model,
            gemini_api_key,
            reddit,
        })
    }

    /// Path of the persisted library file.
    pub fn library_file(&self) -> PathBuf {
        self.data_dir.join("content_library.json")
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn load_config_file() -> Result<ConfigFile> {
    let path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("linklore")
        .join("config.toml");
    if !path.exists() {
        return Ok(ConfigFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
}
