//! Prompt and title defaults.
//!
//! The per-page prompt is user-supplied text; this module only holds the
//! fallback used when a request leaves it blank, plus the default title a
//! new Google Doc gets when the user does not name one.

/// Prompt sent with each page image when the caller supplies none.
pub const DEFAULT_PROMPT: &str = "Describe the page";

/// Pick the effective prompt: the caller's text if it has any content,
/// otherwise `fallback`.
pub fn effective_prompt(user: Option<&str>, fallback: &str) -> String {
    match user.map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => fallback.to_string(),
    }
}

/// Default title for a document created from an analysed PDF.
pub fn default_document_title(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, ext)| if ext.eq_ignore_ascii_case("pdf") { stem } else { file_name })
        .unwrap_or(file_name)
        .trim();
    if stem.is_empty() {
        "PDF analysis".to_string()
    } else {
        format!("{stem} — page descriptions")
    }
}
