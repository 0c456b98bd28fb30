//! Source-platform classification.
//!
//! Maps a domain (and, for custom domains, the page markup) to one of a
//! closed set of platform tags. Domain matching wins; markup heuristics are
//! consulted only when no domain entry matches. Pure classification — no
//! network access here.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Closed set of source platforms the extraction pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Substack,
    Beehiiv,
    Ghost,
    Mailchimp,
    Convertkit,
    Buttondown,
    Revue,
    Paragraph,
    Medium,
    Reddit,
    Linkedin,
    General,
}

impl Platform {
    /// Lowercase tag name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Substack => "substack",
            Platform::Beehiiv => "beehiiv",
            Platform::Ghost => "ghost",
            Platform::Mailchimp => "mailchimp",
            Platform::Convertkit => "convertkit",
            Platform::Buttondown => "buttondown",
            Platform::Revue => "revue",
            Platform::Paragraph => "paragraph",
            Platform::Medium => "medium",
            Platform::Reddit => "reddit",
            Platform::Linkedin => "linkedin",
            Platform::General => "general",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::General
    }
}

/// Static domain → platform table. Substring match, case-insensitive.
pub const DOMAIN_TABLE: &[(&str, Platform)] = &[
    ("substack.com", Platform::Substack),
    ("beehiiv.com", Platform::Beehiiv),
    ("ghost.io", Platform::Ghost),
    ("ghost.org", Platform::Ghost),
    ("mailchimp.com", Platform::Mailchimp),
    ("campaign-archive.com", Platform::Mailchimp),
    ("convertkit.com", Platform::Convertkit),
    ("kit.co", Platform::Convertkit),
    ("buttondown.email", Platform::Buttondown),
    ("revue.email", Platform::Revue),
    ("getrevue.co", Platform::Revue),
    ("paragraph.xyz", Platform::Paragraph),
    ("medium.com", Platform::Medium),
    ("reddit.com", Platform::Reddit),
    ("redd.it", Platform::Reddit),
];

/// True if the domain belongs to the discussion site with its own fetch path.
pub fn is_reddit_domain(domain: &str) -> bool {
    let d = domain.to_lowercase();
    d.contains("reddit.com") || d.contains("redd.it")
}

/// Classify a page into a platform tag.
///
/// LinkedIn is special-cased ahead of the table, then the domain table, then
/// markup heuristics in fixed priority order, then [`Platform::General`].
pub fn detect_platform(domain: &str, doc: &Html) -> Platform {
    let domain = domain.to_lowercase();

    if domain.contains("linkedin.com") {
        return Platform::Linkedin;
    }
    for (pattern, platform) in DOMAIN_TABLE {
        if domain.contains(pattern) {
            return *platform;
        }
    }

    detect_from_markup(doc).unwrap_or(Platform::General)
}

/// Markup heuristics for custom domains, in priority order: publisher meta,
/// content-wrapper class, generator meta, script bundle URL, bulk-email
/// template container.
fn detect_from_markup(doc: &Html) -> Option<Platform> {
    if meta_contains(doc, "property", "article:publisher", "substack") {
        return Some(Platform::Substack);
    }
    if select_any(doc, r#"[class*="post-content"][class*="available-content"]"#) {
        return Some(Platform::Substack);
    }

    if meta_contains(doc, "name", "generator", "ghost") {
        return Some(Platform::Ghost);
    }

    if select_any(doc, r#"[data-testid*="beehiiv" i]"#) {
        return Some(Platform::Beehiiv);
    }
    if script_src_contains(doc, "beehiiv") {
        return Some(Platform::Beehiiv);
    }

    if select_any(doc, "#templateBody") || select_any(doc, ".mcnTextContent") {
        return Some(Platform::Mailchimp);
    }

    None
}

/// True if a `<meta>` with the given attribute name has a content value
/// containing `needle` (case-insensitive).
fn meta_contains(doc: &Html, attr: &str, key: &str, needle: &str) -> bool {
    let Ok(selector) = Selector::parse(&format!(r#"meta[{attr}="{key}"]"#)) else {
        return false;
    };
    doc.select(&selector).any(|el| {
        el.value()
            .attr("content")
            .is_some_and(|c| c.to_lowercase().contains(needle))
    })
}

fn script_src_contains(doc: &Html, needle: &str) -> bool {
    let Ok(selector) = Selector::parse("script[src]") else {
        return false;
    };
    doc.select(&selector)
        .any(|el| el.value().attr("src").is_some_and(|s| s.contains(needle)))
}

fn select_any(doc: &Html, css: &str) -> bool {
    Selector::parse(css).is_ok_and(|s| doc.select(&s).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> Html {
        Html::parse_document("<html><body></body></html>")
    }

    #[test]
    fn domain_table_covers_all_supported_domains() {
        let doc = empty_doc();
        for (domain, expected) in DOMAIN_TABLE {
            assert_eq!(detect_platform(domain, &doc), *expected, "{domain}");
        }
    }

    #[test]
    fn subdomains_match_by_substring() {
        let doc = empty_doc();
        assert_eq!(detect_platform("foo.substack.com", &doc), Platform::Substack);
        assert_eq!(detect_platform("old.reddit.com", &doc), Platform::Reddit);
        assert_eq!(detect_platform("us1.campaign-archive.com", &doc), Platform::Mailchimp);
    }

    #[test]
    fn linkedin_takes_precedence() {
        let doc = empty_doc();
        assert_eq!(detect_platform("www.linkedin.com", &doc), Platform::Linkedin);
    }

    #[test]
    fn unknown_domain_with_empty_markup_is_general() {
        assert_eq!(detect_platform("example.com", &empty_doc()), Platform::General);
    }

    #[test]
    fn detects_substack_from_publisher_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="article:publisher" content="https://substack.com"></head></html>"#,
        );
        assert_eq!(detect_platform("example.com", &doc), Platform::Substack);
    }

    #[test]
    fn detects_substack_from_content_wrapper_classes() {
        let doc = Html::parse_document(
            r#"<html><body><div class="post-content available-content">x</div></body></html>"#,
        );
        assert_eq!(detect_platform("example.com", &doc), Platform::Substack);
    }

    #[test]
    fn detects_ghost_from_generator_meta() {
        let doc = Html::parse_document(
            r#"<html><head><meta name="generator" content="Ghost 5.0"></head></html>"#,
        );
        assert_eq!(detect_platform("myblog.example", &doc), Platform::Ghost);
    }

    #[test]
    fn detects_beehiiv_from_script_src() {
        let doc = Html::parse_document(
            r#"<html><head><script src="https://cdn.beehiiv.com/bundle.js"></script></head></html>"#,
        );
        assert_eq!(detect_platform("news.example", &doc), Platform::Beehiiv);
    }

    #[test]
    fn detects_mailchimp_from_template_container() {
        let doc = Html::parse_document(
            r#"<html><body><table id="templateBody"><tr><td>hi</td></tr></table></body></html>"#,
        );
        assert_eq!(detect_platform("archive.example", &doc), Platform::Mailchimp);
    }

    #[test]
    fn reddit_domain_check() {
        assert!(is_reddit_domain("www.reddit.com"));
        assert!(is_reddit_domain("redd.it"));
        assert!(!is_reddit_domain("example.com"));
    }

    #[test]
    fn platform_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Platform::Beehiiv).unwrap(), "\"beehiiv\"");
        let p: Platform = serde_json::from_str("\"linkedin\"").unwrap();
        assert_eq!(p, Platform::Linkedin);
    }
}
