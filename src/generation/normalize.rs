//! Normalization of raw model output.

/// Strips a single optional markdown code fence from model output.
///
/// A leading fence (three backticks plus an optional language tag such as
/// `json` or `markdown`, up to the end of its line) and a trailing fence are
/// each removed at most once. Output without fences is returned trimmed.
/// Fences inside the body are left alone.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => {
                let tag = &rest[..newline];
                if tag.trim().chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                    &rest[newline + 1..]
                } else {
                    rest
                }
            }
            // Single-line fenced text: ```{"a": 1}```
            None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
    }

    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}
