//! Text folding shared by the cache key and the product matcher.

use unicode_normalization::UnicodeNormalization;

/// Fold text for case-insensitive comparison: NFC, then lowercase.
pub fn fold(text: &str) -> String {
    text.nfc().collect::<String>().to_lowercase()
}

/// Normalize a user query into a cache key body: trimmed and folded.
pub fn normalize_query(query: &str) -> String {
    fold(query.trim())
}

/// Short, char-safe preview of user text for log fields.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push('…');
    }
    out
}
