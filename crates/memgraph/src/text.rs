//! Text normalization shared by the fast-cache key, the keyword index and
//! the intent boost.

use sha2::{Digest, Sha256};

/// Lower-case, collapse whitespace and strip trailing sentence punctuation.
///
/// `"  My  name is Ada. "` and `"my name is ada"` normalize identically.
pub fn normalize(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_string()
}

/// Fast-cache key: SHA-256 hex digest of the normalized text
pub fn content_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize(text).as_bytes());
    hex::encode(hasher.finalize())
}

/// Query tokens for the intent boost: lower-cased, whitespace-split, verbatim
pub fn query_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Distinct keyword-index tokens: lower-cased, whitespace-split, with
/// surrounding punctuation removed. Order of first appearance is kept.
pub fn index_tokens(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    text.to_lowercase()
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .filter(|word| seen.insert(word.to_string()))
        .map(str::to_string)
        .collect()
}

/// Truncate to at most `max_chars` characters, appending `...` when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let truncated: String = text.chars().take(max_chars).collect();
    if truncated.len() < text.len() {
        format!("{truncated}...")
    } else {
        truncated
    }
}
