//! Text normalization for matching user input against upstream records
//!
//! Users type "Senador Queiróz", the upstream stores "SENADOR QUEIROZ".
//! Matching therefore happens on a folded form: compatibility-decomposed,
//! combining marks removed, uppercased.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Remove diacritics, keeping the base letters ("São Paulo" becomes "Sao Paulo")
pub fn fold_diacritics(input: &str) -> String {
    input.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Fold diacritics and uppercase
pub fn normalize_for_match(input: &str) -> String {
    fold_diacritics(input).to_uppercase()
}

/// Normalized whitespace-separated tokens
pub fn match_tokens(input: &str) -> Vec<String> {
    normalize_for_match(input)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
