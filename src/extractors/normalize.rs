// src/extractors/normalize.rs
//! Text cleanup and numeric coercion shared by both extractors.

use once_cell::sync::Lazy;
use regex::Regex;

static DIGIT_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+").expect("Failed to compile DIGIT_RUN_RE"));

/// Collapses whitespace runs (including `&nbsp;` once decoded) to one
/// space and trims both ends.
pub fn clean_text(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses the first maximal run of ASCII digits anywhere in `s`.
///
/// "25 (2 de penalti)" yields 25, not 2. Runs too long for a `u32` are
/// treated like no digits at all.
pub fn extract_leading_number(s: &str, default: Option<u32>) -> Option<u32> {
    DIGIT_RUN_RE
        .find(s)
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .or(default)
}

/// Goals column: absent or unparseable text counts as zero.
pub fn extract_goals(s: &str) -> u32 {
    extract_leading_number(s, Some(0)).unwrap_or(0)
}

/// Matches column: absent or unparseable text stays absent.
pub fn extract_matches(s: &str) -> Option<u32> {
    extract_leading_number(s, None)
}
