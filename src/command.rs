//! Message command parsing.
//!
//! A message may carry a leading `!command` token, zero or more URLs, and
//! free-form text. Parsing is case-insensitive on the command token; the
//! first URL in the remainder wins and the rest of the text (URLs removed)
//! becomes the `extra` argument. A bare URL with no command means
//! `!summarize`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Accepts `http(s)://` followed by any run of characters that are not
/// whitespace, angle brackets, quotes, or closing brackets.
pub static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s<>"')\]}]+"#).expect("valid regex"));

/// The command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Summarize,
    Research,
    Article,
    Code,
    Extract,
    Newsletter,
    Trend,
    Brand,
    Collect,
    Library,
    Analyze,
    Clear,
    History,
    Status,
    Help,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Summarize => "summarize",
            Command::Research => "research",
            Command::Article => "article",
            Command::Code => "code",
            Command::Extract => "extract",
            Command::Newsletter => "newsletter",
            Command::Trend => "trend",
            Command::Brand => "brand",
            Command::Collect => "collect",
            Command::Library => "library",
            Command::Analyze => "analyze",
            Command::Clear => "clear",
            Command::History => "history",
            Command::Status => "status",
            Command::Help => "help",
        }
    }
}

/// Commands whose remainder is scanned for a URL.
const URL_COMMANDS: &[Command] = &[
    Command::Summarize,
    Command::Research,
    Command::Article,
    Command::Code,
    Command::Extract,
    Command::Newsletter,
    Command::Brand,
    Command::Collect,
];

/// Commands that take only text.
const TEXT_COMMANDS: &[Command] = &[
    Command::Trend,
    Command::Library,
    Command::Analyze,
    Command::Clear,
    Command::History,
    Command::Status,
    Command::Help,
];

/// Result of parsing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// `None` means no command token and no URL: a follow-up or free chat.
    pub command: Option<Command>,
    pub url: Option<String>,
    /// Remaining text with command token and URLs removed.
    pub extra: String,
}

/// Parse a message into command, URL, and extra text.
pub fn parse_message(text: &str) -> ParsedMessage {
    let text = text.trim();
    let lower = text.to_lowercase();

    for command in URL_COMMANDS {
        if let Some(remainder) = strip_command(text, &lower, command.name()) {
            let url = URL_PATTERN.find(remainder).map(|m| m.as_str().to_string());
            let extra = URL_PATTERN.replace_all(remainder, "").trim().to_string();
            return ParsedMessage {
                command: Some(*command),
                url,
                extra,
            };
        }
    }

    for command in TEXT_COMMANDS {
        if let Some(remainder) = strip_command(text, &lower, command.name()) {
            return ParsedMessage {
                command: Some(*command),
                url: None,
                extra: remainder.trim().to_string(),
            };
        }
    }

    // Bare URL: treat as a summarize request.
    if let Some(m) = URL_PATTERN.find(text) {
        let url = m.as_str().to_string();
        let extra = URL_PATTERN.replace_all(text, "").trim().to_string();
        return ParsedMessage {
            command: Some(Command::Summarize),
            url: Some(url),
            extra,
        };
    }

    ParsedMessage {
        command: None,
        url: None,
        extra: text.to_string(),
    }
}

/// If `text` starts with `!<name>` (case-insensitive), return the remainder.
fn strip_command<'a>(text: &'a str, lower: &str, name: &str) -> Option<&'a str> {
    let token = format!("!{name}");
    if lower.starts_with(&token) {
        Some(text[token.len()..].trim_start())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_url_becomes_summarize() {
        let parsed = parse_message("check this out https://example.com/post");
        assert_eq!(parsed.command, Some(Command::Summarize));
        assert_eq!(parsed.url.as_deref(), Some("https://example.com/post"));
        assert_eq!(parsed.extra, "check this out");
    }

    #[test]
    fn explicit_command_with_url() {
        let parsed = parse_message("!research https://example.com/a focus on costs");
        assert_eq!(parsed.command, Some(Command::Research));
        assert_eq!(parsed.url.as_deref(), Some("https://example.com/a"));
        assert_eq!(parsed.extra, "focus on costs");
    }

    #[test]
    fn command_token_is_case_insensitive() {
        let parsed = parse_message("!SuMMaRize https://example.com");
        assert_eq!(parsed.command, Some(Command::Summarize));
    }

    #[test]
    fn url_pattern_stops_at_quotes_and_brackets() {
        let m = URL_PATTERN.find(r#"see <https://example.com/x> and "https://e.com/y""#).unwrap();
        assert_eq!(m.as_str(), "https://example.com/x");
        let m = URL_PATTERN.find("(https://example.com/z)").unwrap();
        assert_eq!(m.as_str(), "https://example.com/z");
    }

    #[test]
    fn collect_carries_name_and_url() {
        let parsed = parse_message("!collect ai-news https://example.com/article");
        assert_eq!(parsed.command, Some(Command::Collect));
        assert_eq!(parsed.url.as_deref(), Some("https://example.com/article"));
        assert_eq!(parsed.extra, "ai-news");
    }

    #[test]
    fn brand_without_url_is_text_only() {
        let parsed = parse_message("!brand Ferris Industries");
        assert_eq!(parsed.command, Some(Command::Brand));
        assert_eq!(parsed.url, None);
        assert_eq!(parsed.extra, "Ferris Industries");
    }

    #[test]
    fn text_commands_keep_remainder() {
        let parsed = parse_message("!trend rust adoption");
        assert_eq!(parsed.command, Some(Command::Trend));
        assert_eq!(parsed.extra, "rust adoption");

        let parsed = parse_message("!library ml-papers");
        assert_eq!(parsed.command, Some(Command::Library));
        assert_eq!(parsed.extra, "ml-papers");
    }

    #[test]
    fn plain_text_is_no_command() {
        let parsed = parse_message("what did the author mean by that?");
        assert_eq!(parsed.command, None);
        assert_eq!(parsed.url, None);
        assert_eq!(parsed.extra, "what did the author mean by that?");
    }

    #[test]
    fn first_url_wins_when_multiple_present() {
        let parsed = parse_message("!summarize https://a.com/1 https://b.com/2");
        assert_eq!(parsed.url.as_deref(), Some("https://a.com/1"));
    }
}
