//! Free-text to label-sequence conversion.

use std::sync::OnceLock;

use regex::Regex;

fn separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[,\n]+").expect("static separator regex"))
}

/// Split on runs of commas/newlines, trim each piece, drop empties.
pub fn tokenize_labels(text: &str) -> Vec<String> {
    separator()
        .split(text)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Right-pad `tokens` with empty strings up to `len`. Never truncates.
pub fn pad_to(mut tokens: Vec<String>, len: usize) -> Vec<String> {
    if tokens.len() < len {
        tokens.resize(len, String::new());
    }
    tokens
}
