// Text utils

use once_cell::sync::Lazy;
use regex::Regex;

/// Parentheses, word runs, dollar amounts, then any other non-space run.
const TOKEN_PATTERN: &str = r"\(|\)|\w+|\$[\d\.]+|\S+";

/// The single tokenizer shared by every scan of a run, so the same line
/// always yields the same tokens.
pub static TOKENIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(TOKEN_PATTERN).expect("token pattern is a valid regex"));

/// Lowercases `phrase` and splits it into tokens.
pub fn tokenize(phrase: &str) -> Vec<String> {
    let lowered = phrase.to_lowercase();
    TOKENIZER
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Ratio of `a` to `b`, with 0 when `b` is zero.
pub fn safe_ratio(a: usize, b: usize) -> f64 {
    if b == 0 {
        0.0
    } else {
        a as f64 / b as f64
    }
}
