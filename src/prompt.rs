//! Prompt assembly for the generative backend.
//!
//! Consumes normalized pipeline output: single-URL task prompts, follow-up
//! prompts against cached channel content, and multi-source prompts for
//! trend, brand, and collection analysis.

use crate::command::Command;
use crate::fetch::FetchResult;
use crate::library::SourceDoc;
use crate::normalize::char_prefix;
use crate::platform::Platform;

/// Characters of each source included in a multi-source prompt.
const SOURCE_CHARS: usize = 8_000;

/// Header block shared by all single-URL prompts.
fn content_header(result: &FetchResult) -> String {
    let mut header = format!("Source: {}", result.url);
    if !result.title.is_empty() {
        header.push_str(&format!("\nTitle: {}", result.title));
    }
    if result.platform != Platform::General {
        header.push_str(&format!("\nPlatform: {}", result.platform));
    }
    if let Some(author) = &result.metadata.author {
        header.push_str(&format!("\nAuthor: {author}"));
    }
    if let Some(date) = &result.metadata.date {
        header.push_str(&format!("\nPublished: {date}"));
    }
    header.push_str(&format!("\n\nExtracted content:\n{}", result.content));
    header
}

/// Build the task prompt for a single-URL command.
pub fn build_prompt(command: Command, result: &FetchResult, extra: &str) -> String {
    let header = content_header(result);
    match command {
        Command::Summarize => format!(
            "{header}\n\nProvide a clear, concise summary of this content. \
             Include the key points, main argument or topic, and any notable details. \
             Format with bullet points where appropriate."
        ),
        Command::Research => format!(
            "{header}\n\nPerform a deep analysis of this content:\n\
             1. Main thesis or topic\n\
             2. Key arguments and supporting evidence\n\
             3. Notable quotes or data points\n\
             4. Strengths and weaknesses of the arguments\n\
             5. Related topics worth exploring further\n\
             6. Key takeaways\n{}",
            optional_line("Additional context", extra)
        ),
        Command::Article => format!(
            "{header}\n\nUsing this content as source material, draft an original article. \
             The article should:\n\
             - Have a compelling headline\n\
             - Synthesize the key ideas into a coherent narrative\n\
             - Add context and analysis\n\
             - Be well-structured with clear sections\n\
             - Be roughly 500-800 words\n{}",
            optional_line("Article direction", extra)
        ),
        Command::Code => format!(
            "{header}\n\nAnalyze this content from a software engineering perspective:\n\
             1. Identify any technical concepts, tools, or frameworks mentioned\n\
             2. Suggest code implementations or projects inspired by the content\n\
             3. If code snippets are present, explain and improve them\n\
             4. Propose automation or tooling ideas based on the content\n{}",
            optional_line("Focus area", extra)
        ),
        Command::Newsletter => format!(
            "{header}\n\nThis is a newsletter. Analyze it as follows:\n\
             1. **Newsletter overview** — what is the theme / edition about?\n\
             2. **Key stories / sections** — bullet each distinct topic covered\n\
             3. **Notable insights or opinions** — anything the author emphasizes\n\
             4. **Links & resources mentioned** — list any notable references\n\
             5. **Actionable takeaways** — what should a reader do with this info?\n{}",
            optional_line("Focus", extra)
        ),
        _ => format!("{header}\n\nSummarize this content."),
    }
}

/// Follow-up question against the channel's cached content.
pub fn build_followup_prompt(cached: &FetchResult, question: &str) -> String {
    format!(
        "Previously extracted content from {}:\nTitle: {}\nPlatform: {}\n\n{}\n\n\
         User question: {question}\n\n\
         Answer the user's question based on the extracted content above. \
         If the question goes beyond the content, you may use your general knowledge \
         but note what comes from the source vs. your own knowledge.",
        cached.url, cached.title, cached.platform, cached.content
    )
}

/// Trend analysis across collected sources.
pub fn build_trend_prompt(topic: &str, sources: &[SourceDoc]) -> String {
    let mut prompt = format!("Analyze trends on the topic: **{topic}**\n\nSources:\n");
    push_sources(&mut prompt, sources);
    prompt.push_str(
        "\nBased on these sources, provide:\n\
         1. **Emerging trends** — what patterns or directions are appearing?\n\
         2. **Consensus views** — what do most sources agree on?\n\
         3. **Contrarian takes** — any dissenting or unique perspectives?\n\
         4. **Timeline / momentum** — are things accelerating, plateauing, or declining?\n\
         5. **Gaps** — what's not being covered that should be?\n\
         6. **Prediction** — where is this topic heading in the next 6-12 months?\n",
    );
    prompt
}

/// Brand-perception analysis across collected sources.
pub fn build_brand_prompt(brand: &str, sources: &[SourceDoc]) -> String {
    let mut prompt = format!("Analyze brand perception for: **{brand}**\n\nSources:\n");
    push_sources(&mut prompt, sources);
    prompt.push_str(&format!(
        "\nProvide a brand perception analysis for **{brand}**:\n\
         1. **Overall sentiment** — positive, negative, mixed? Give a 1-10 score\n\
         2. **Key themes** — what topics/attributes are associated with this brand?\n\
         3. **Strengths highlighted** — what do sources praise?\n\
         4. **Weaknesses / criticisms** — what do sources criticize or question?\n\
         5. **Competitive positioning** — how is the brand positioned vs. alternatives?\n\
         6. **Audience perception** — who talks about it and how?\n\
         7. **Trend direction** — is perception improving, declining, or stable?\n\
         8. **Recommendations** — strategic suggestions based on the perception data\n"
    ));
    prompt
}

/// Cross-source analysis of one named collection.
pub fn build_collection_prompt(name: &str, sources: &[SourceDoc]) -> String {
    let mut prompt = format!(
        "Deep analysis of collection: **{name}** ({} sources)\n\nSources:\n",
        sources.len()
    );
    push_sources(&mut prompt, sources);
    prompt.push_str(
        "\nProvide a comprehensive cross-source analysis:\n\
         1. **Common themes** across all sources\n\
         2. **Key insights** — the most important takeaways\n\
         3. **Contradictions or debates** — where do sources disagree?\n\
         4. **Trends** — what direction is the topic moving?\n\
         5. **Gaps** — what's missing from this collection?\n\
         6. **Synthesis** — tie it all together into a cohesive narrative\n\
         7. **Next steps** — what should be researched or collected next?\n",
    );
    prompt
}

fn push_sources(prompt: &mut String, sources: &[SourceDoc]) {
    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!(
            "--- Source {} ---\nURL: {}\nTitle: {}\nDate: {}\nContent:\n{}\n\n",
            i + 1,
            non_empty(&source.url),
            non_empty(&source.title),
            source.date.as_deref().unwrap_or("N/A"),
            char_prefix(&source.content, SOURCE_CHARS)
        ));
    }
}

fn non_empty(s: &str) -> &str {
    if s.is_empty() {
        "N/A"
    } else {
        s
    }
}

fn optional_line(label: &str, extra: &str) -> String {
    if extra.is_empty() {
        String::new()
    } else {
        format!("{label}: {extra}")
    }
}
