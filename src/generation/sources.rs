//! Cleaning and bounding of instructor-supplied source text.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::SourceSummary;

/// Upper bound on characters of source context sent in one prompt.
pub const MAX_CONTEXT_CHARS: usize = 12_000;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static LONG_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S{80,}").expect("valid regex"));
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Collapses whitespace and drops HTML tags and over-long URLs.
pub fn clean_text(text: &str) -> String {
    let text = WHITESPACE.replace_all(text, " ");
    let text = LONG_URL.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    text.trim().to_string()
}

/// Truncates to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Joins source summaries into one labelled context block.
pub fn combine_summaries(summaries: &[SourceSummary]) -> String {
    let combined = summaries
        .iter()
        .filter(|s| !s.summary.trim().is_empty())
        .map(|s| format!("--- Summary from {} ---\n{}", s.label, s.summary.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_chars(&combined, MAX_CONTEXT_CHARS).to_string()
}
