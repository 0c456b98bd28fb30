//! Generative-language backend.
//!
//! The agent treats the model as an opaque text-in/text-out service behind
//! the [`TextModel`] trait; [`GeminiClient`] is the REST implementation
//! against the Gemini `generateContent` endpoint. Unlike fetch failures,
//! generation errors propagate as [`ModelError`] and are caught at each
//! call site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Generative-backend errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error: {0}")]
    Api(String),

    /// Parse error (invalid JSON, empty candidate list)
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Opaque text-in/text-out generative service.
#[async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Gemini REST API client.
pub struct GeminiClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    /// Create from the `GEMINI_API_KEY` environment variable.
    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| ModelError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    /// Set a custom base URL (for proxies or tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Calling generateContent");
        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("HTTP {status}: {body}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))?;
        body.first_text()
            .ok_or_else(|| ModelError::Parse("response contained no candidates".into()))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate's parts.
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: Vec<&str> = content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.is_empty())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text.join(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_candidate_text() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text().as_deref(), Some("Hello world"));
    }

    #[test]
    fn empty_candidates_yield_none() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(response.first_text().is_none());
    }

    #[test]
    fn missing_fields_default_cleanly() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(response.first_text().is_none());
    }

    #[test]
    fn request_serializes_expected_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "hi".into(),
                }],
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
