use once_cell::sync::Lazy;
use regex::Regex;

// Sentence-ending punctuation, plus any whitespace caught between marks.
static TRAILING_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,!?;:()\s]+$").expect("valid trailing punctuation regex"));

/// Canonical cache key for a question.
///
/// Collapses whitespace runs to single spaces, trims, lowercases and strips
/// a trailing run of sentence-ending punctuation. Idempotent.
pub fn normalize_question(question: &str) -> String {
    let collapsed = question.split_whitespace().collect::<Vec<_>>().join(" ");
    let lowered = collapsed.to_lowercase();
    TRAILING_PUNCTUATION.replace(&lowered, "").into_owned()
}
