//! Text normalization for transaction descriptions

use regex::Regex;
use std::sync::OnceLock;

/// Words too common in transaction text to carry category signal
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "your", "you", "are", "was", "were",
    "has", "have", "had", "not", "but", "all", "any", "can", "our", "out", "per", "via", "inc",
    "llc", "ltd", "corp", "com", "www", "http", "https", "pos", "purchase", "debit", "card",
    "transaction", "payment",
];

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("static pattern compiles"))
}

/// Split free text into category-bearing tokens
///
/// Lowercases, strips everything but letters, digits and whitespace, splits
/// on whitespace and drops tokens of two characters or fewer as well as
/// stop words. Order and duplicates are preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = non_alphanumeric().replace_all(&lowered, "");

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > 2)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Tokens of a description plus optional merchant name
pub fn tokenize_record(description: &str, merchant: Option<&str>) -> Vec<String> {
    match merchant {
        Some(m) if !m.trim().is_empty() => tokenize(&format!("{} {}", description, m)),
        _ => tokenize(description),
    }
}
