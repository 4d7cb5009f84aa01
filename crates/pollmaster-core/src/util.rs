//! Text helpers shared by config, auth, and the API client.

/// Trimmed text, or `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// `http://` or `https://` URL, ignoring scheme case.
pub fn is_http_url(value: &str) -> bool {
    let lower = value.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Server text cut down for error messages.
pub fn compact_text(value: &str) -> String {
    const MAX_CHARS: usize = 180;
    value.trim().chars().take(MAX_CHARS).collect()
}
