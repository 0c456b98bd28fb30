//! Shared page-metadata extraction.
//!
//! Scans `<meta>` tags for author, publish date, and description. Each field
//! checks a fixed key list and keeps the first non-empty value; fields that
//! are not discoverable stay absent rather than becoming empty strings.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Optional metadata discovered alongside extracted content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PageMetadata {
    /// Scan the document's meta tags. First found per field wins.
    pub fn extract(doc: &Html) -> Self {
        Self {
            author: first_meta(doc, &["author", "article:author"]),
            date: first_meta(doc, &["article:published_time", "date", "datePublished"]),
            description: first_meta(doc, &["og:description", "description", "twitter:description"]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.date.is_none() && self.description.is_none()
    }
}

/// Content of the first matching meta tag, checking both `name=` and
/// `property=` attributes. Whitespace-trimmed; empty values are skipped.
pub fn meta_content(doc: &Html, key: &str) -> Option<String> {
    let css = format!(r#"meta[name="{key}"], meta[property="{key}"]"#);
    let selector = Selector::parse(&css).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(ToString::to_string)
}

fn first_meta(doc: &Html, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| meta_content(doc, key))
}
