//! Per-platform content extraction.
//!
//! Each platform extractor tries an ordered list of content-container
//! selectors and returns the text of the first one found. Every
//! platform-specific extractor falls back to [`extract_general`] when no
//! container matches — the fallback chain is mandatory, not best-effort.
//!
//! Text collection skips `script`/`style`/navigation/decorative subtrees
//! instead of mutating the DOM, so platform detection run on the same
//! document still sees script-src hints.

pub mod metadata;

use scraper::{ElementRef, Html, Selector};

use crate::normalize::collapse_newlines;
use crate::platform::Platform;

/// Elements never contributing to extracted text.
const STRIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "iframe", "svg",
];

type ExtractorFn = fn(&Html) -> String;

/// Static platform → extractor dispatch table. Adding a platform means one
/// entry here and one function below.
const EXTRACTORS: &[(Platform, ExtractorFn)] = &[
    (Platform::Substack, extract_substack),
    (Platform::Beehiiv, extract_beehiiv),
    (Platform::Ghost, extract_ghost),
    (Platform::Mailchimp, extract_mailchimp),
    (Platform::Convertkit, extract_convertkit),
    (Platform::Buttondown, extract_buttondown),
    (Platform::Revue, extract_general),
    (Platform::Paragraph, extract_general),
    (Platform::Medium, extract_medium),
    (Platform::Linkedin, extract_linkedin),
    // Reddit content normally arrives through its own fetch path; HTML that
    // lands here anyway gets the general treatment.
    (Platform::Reddit, extract_general),
    (Platform::General, extract_general),
];

/// Extract plain-text content from `doc` using the platform's strategy.
pub fn extract_content(platform: Platform, doc: &Html) -> String {
    EXTRACTORS
        .iter()
        .find(|(p, _)| *p == platform)
        .map_or_else(|| extract_general(doc), |(_, f)| f(doc))
}

/// Text of the first element matching any selector in `css_list`, in list
/// order. `None` when no container matches.
fn first_container_text(doc: &Html, css_list: &[&str]) -> Option<String> {
    for css in css_list {
        let Ok(selector) = Selector::parse(css) else {
            continue;
        };
        if let Some(el) = doc.select(&selector).next() {
            return Some(element_text(el));
        }
    }
    None
}

/// Plain text of an element: text nodes trimmed and joined with newlines,
/// skipping stripped subtrees.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    collect_text(el, &mut parts);
    parts.join("\n")
}

fn collect_text(el: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if !STRIPPED_TAGS.contains(&child_el.value().name()) {
                collect_text(child_el, parts);
            }
        }
    }
}

fn extract_substack(doc: &Html) -> String {
    first_container_text(
        doc,
        &[".body.markup", ".available-content", ".post-content", "article"],
    )
    .unwrap_or_else(|| extract_general(doc))
}

fn extract_beehiiv(doc: &Html) -> String {
    first_container_text(
        doc,
        &[
            r#"[data-testid="post-body"]"#,
            r#"[class*="post-body" i]"#,
            r#"[class*="email-body" i]"#,
            "article",
        ],
    )
    .unwrap_or_else(|| extract_general(doc))
}

fn extract_ghost(doc: &Html) -> String {
    first_container_text(
        doc,
        &[".gh-content", ".post-content", ".article-content", "article"],
    )
    .unwrap_or_else(|| extract_general(doc))
}

fn extract_mailchimp(doc: &Html) -> String {
    first_container_text(doc, &["#templateBody", ".mcnTextContent", "#bodyTable"])
        .unwrap_or_else(|| extract_general(doc))
}

fn extract_convertkit(doc: &Html) -> String {
    first_container_text(
        doc,
        &[
            r#"[class*="letter-body" i]"#,
            r#"[class*="broadcast-content" i]"#,
            r#"[class*="post-body" i]"#,
            "article",
        ],
    )
    .unwrap_or_else(|| extract_general(doc))
}

fn extract_buttondown(doc: &Html) -> String {
    first_container_text(
        doc,
        &[
            r#"[class*="email-body" i]"#,
            r#"[class*="letter-body" i]"#,
            "article",
        ],
    )
    .unwrap_or_else(|| extract_general(doc))
}

fn extract_medium(doc: &Html) -> String {
    first_container_text(doc, &["article", r#"[class*="postArticle-content" i]"#])
        .unwrap_or_else(|| extract_general(doc))
}

/// LinkedIn renders most content client-side; when no article container is
/// present, fall back to stitching together the page's social meta tags.
fn extract_linkedin(doc: &Html) -> String {
    if let Some(text) = first_container_text(
        doc,
        &["article", r#"[class*="article" i]"#, r#"[class*="post-content" i]"#],
    ) {
        return text;
    }

    let mut parts: Vec<String> = Vec::new();
    for key in ["description", "og:description", "og:title", "twitter:description"] {
        if let Some(content) = metadata::meta_content(doc, key) {
            if !parts.contains(&content) {
                parts.push(content);
            }
        }
    }
    if !parts.is_empty() {
        return parts.join("\n\n");
    }
    extract_general(doc)
}

/// General extractor: semantic containers first, then class-pattern matches,
/// then the document body. Collapses 3+ newlines to exactly two.
pub fn extract_general(doc: &Html) -> String {
    let text = first_container_text(
        doc,
        &[
            "article",
            "main",
            r#"[role="main"]"#,
            r#"[class*="article" i], [class*="post" i], [class*="content" i], [class*="entry" i]"#,
            "body",
        ],
    )
    .unwrap_or_default();
    collapse_newlines(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substack_prefers_body_markup_container() {
        let doc = Html::parse_document(
            r#"<html><body>
                <div class="body markup">The newsletter body.</div>
                <article>Should not win</article>
            </body></html>"#,
        );
        assert_eq!(extract_content(Platform::Substack, &doc), "The newsletter body.");
    }

    #[test]
    fn ghost_uses_gh_content() {
        let doc = Html::parse_document(
            r#"<html><body><div class="gh-content"><p>Ghost post.</p></div></body></html>"#,
        );
        assert_eq!(extract_content(Platform::Ghost, &doc), "Ghost post.");
    }

    #[test]
    fn mailchimp_uses_template_body() {
        let doc = Html::parse_document(
            r#"<html><body><div id="templateBody"><p>Campaign text</p></div></body></html>"#,
        );
        assert_eq!(extract_content(Platform::Mailchimp, &doc), "Campaign text");
    }

    #[test]
    fn every_platform_falls_back_to_general() {
        // No platform container present anywhere — each extractor must
        // return exactly what the general extractor returns.
        let doc = Html::parse_document(
            "<html><body><div><p>Plain paragraph one.</p><p>Two.</p></div></body></html>",
        );
        let general = extract_general(&doc);
        assert!(!general.is_empty());
        for (platform, _) in EXTRACTORS {
            assert_eq!(
                extract_content(*platform, &doc),
                general,
                "fallback broken for {platform}"
            );
        }
    }

    #[test]
    fn stripped_tags_do_not_leak_into_text() {
        let doc = Html::parse_document(
            r#"<html><body><article>
                <script>var x = 1;</script>
                <style>.a{}</style>
                <nav>Menu</nav>
                <p>Kept text.</p>
            </article></body></html>"#,
        );
        let text = extract_general(&doc);
        assert_eq!(text, "Kept text.");
    }

    #[test]
    fn general_extractor_prefers_article_over_body() {
        let doc = Html::parse_document(
            "<html><body>Noise<article>Article text</article></body></html>",
        );
        assert_eq!(extract_general(&doc), "Article text");
    }

    #[test]
    fn general_extractor_collapses_newline_runs() {
        let doc = Html::parse_document(
            "<html><body><main><p>a</p><div><div><p>b</p></div></div></main></body></html>",
        );
        let text = extract_general(&doc);
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn linkedin_falls_back_to_meta_tags() {
        let doc = Html::parse_document(
            r#"<html><head>
                <meta name="description" content="A post about hiring.">
                <meta property="og:title" content="Hiring update">
            </head><body><div>nothing useful</div></body></html>"#,
        );
        let text = extract_content(Platform::Linkedin, &doc);
        assert!(text.contains("A post about hiring."));
        assert!(text.contains("Hiring update"));
    }

    #[test]
    fn deeply_nested_stripped_subtrees_are_skipped() {
        let doc = Html::parse_document(
            r#"<html><body><article>
                <div><section>
                    <p>Visible.</p>
                    <div><script>var hidden = true;</script><p>Also visible.</p></div>
                </section></div>
            </article></body></html>"#,
        );
        let text = extract_general(&doc);
        assert!(text.contains("Visible."));
        assert!(text.contains("Also visible."));
        assert!(!text.contains("hidden"));
    }

    #[test]
    fn element_text_joins_with_newlines() {
        let doc = Html::parse_document("<html><body><p>one</p><p>two</p></body></html>");
        let selector = Selector::parse("body").unwrap();
        let body = doc.select(&selector).next().unwrap();
        assert_eq!(element_text(body), "one\ntwo");
    }
}
