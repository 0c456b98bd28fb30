//! Content normalization.
//!
//! Everything leaving the extraction pipeline passes through [`normalize`]:
//! runs of three or more newlines collapse to exactly two, and content longer
//! than [`CONTENT_CEILING`] characters is cut there with [`TRUNCATION_MARKER`]
//! appended.

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum number of characters of extracted content kept per URL.
pub const CONTENT_CEILING: usize = 50_000;

/// Appended whenever content is cut at the ceiling.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Collapse 3+ consecutive newlines to exactly two.
pub fn collapse_newlines(text: &str) -> String {
    EXCESS_NEWLINES.replace_all(text, "\n\n").into_owned()
}

/// Cut `text` at [`CONTENT_CEILING`] characters, appending the truncation
/// marker. Content at or under the ceiling is returned unchanged.
pub fn truncate(text: &str) -> String {
    truncate_at(text, CONTENT_CEILING)
}

/// Cut `text` at `ceiling` characters (char-aware, not bytes).
pub fn truncate_at(text: &str, ceiling: usize) -> String {
    if text.chars().count() <= ceiling {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(ceiling).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

/// Normalize extracted content: collapse newline runs, then apply the
/// ceiling. Idempotent — normalizing already-normalized content is a no-op.
pub fn normalize(text: &str) -> String {
    truncate(&collapse_newlines(text))
}

/// First `n` characters of `text` (char-aware), used for previews.
pub fn char_prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}
