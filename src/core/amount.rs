//! Input mask for free-text amounts.
//!
//! Accepted text is ASCII digits, an optional single decimal point and at most
//! two digits after it (`^[0-9]*\.?[0-9]{0,2}$`). The empty string is
//! accepted so the field can be cleared.

use anyhow::{Result, bail};
use regex::Regex;
use std::sync::LazyLock;

const EDITING_KEYS: [&str; 8] = [
    "Backspace",
    "Tab",
    "End",
    "Home",
    "ArrowLeft",
    "ArrowRight",
    "Del",
    "Delete",
];

const MAX_DECIMALS: usize = 2;

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]*\.?[0-9]{0,2}$").expect("amount pattern is a valid regex"));

/// Returns true if `text` matches the amount pattern.
pub fn matches_pattern(text: &str) -> bool {
    AMOUNT_PATTERN.is_match(text)
}

/// Decides whether a keystroke may be applied to the `current` field value.
///
/// `key` is a key name as reported by the input layer: editing keys such as
/// `Backspace` always pass, anything else is appended to `current` and the
/// result must still match the pattern.
pub fn accepts_key(current: &str, key: &str) -> bool {
    if EDITING_KEYS.contains(&key) {
        return true;
    }
    let next = format!("{current}{key}");
    matches_pattern(&next)
}

/// Pasted text is all-or-nothing.
pub fn accepts_paste(text: &str) -> bool {
    matches_pattern(text)
}

/// Simulates typing `text` character by character into an empty field,
/// dropping every keystroke the mask rejects.
pub fn type_text(text: &str) -> String {
    let mut buffer = String::with_capacity(text.len());
    let mut utf8 = [0u8; 4];
    for c in text.chars() {
        let key = c.encode_utf8(&mut utf8);
        if accepts_key(&buffer, key) {
            buffer.push(c);
        }
    }
    buffer
}

/// Parses an amount the way a paste into the field would be handled.
pub fn parse_amount(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Amount is required");
    }
    if !accepts_paste(text) {
        bail!("Invalid amount '{text}': use digits with at most {MAX_DECIMALS} decimal places");
    }
    if text == "." {
        bail!("Invalid amount '{text}'");
    }
    Ok(text.parse::<f64>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern() {
        assert!(matches_pattern(""));
        assert!(matches_pattern("100"));
        assert!(matches_pattern("1."));
        assert!(matches_pattern(".5"));
        assert!(matches_pattern("12.34"));
        assert!(!matches_pattern("1.234"));
        assert!(!matches_pattern("1.2.3"));
        assert!(!matches_pattern("-1"));
        assert!(!matches_pattern("1e5"));
        assert!(!matches_pattern("12a"));
        assert!(!matches_pattern("١٢"));
        assert!(!matches_pattern("1.2\n"));
    }

    #[test]
    fn test_third_decimal_keystroke_is_rejected() {
        assert!(accepts_key("1.2", "3"));
        assert!(!accepts_key("1.23", "4"));
        assert!(!accepts_key("1.23", "."));
        assert_eq!(type_text("1.234"), "1.23");
    }

    #[test]
    fn test_editing_keys_always_pass() {
        assert!(accepts_key("1.23", "Backspace"));
        assert!(accepts_key("1.23", "ArrowLeft"));
        assert!(accepts_key("", "Delete"));
        assert!(!accepts_key("1", "Enter"));
    }

    #[test]
    fn test_type_text_drops_invalid_characters() {
        assert_eq!(type_text("1a0b0"), "100");
        assert_eq!(type_text("1..5"), "1.5");
        assert_eq!(type_text("€25,50"), "2550");
    }

    #[test]
    fn test_paste_is_all_or_nothing() {
        assert!(accepts_paste("250.75"));
        assert!(!accepts_paste("250.755"));
        assert!(!accepts_paste("1,000"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("100").unwrap(), 100.0);
        assert_eq!(parse_amount(" 0.5 ").unwrap(), 0.5);
        assert_eq!(parse_amount("3.").unwrap(), 3.0);
        assert!(parse_amount("").is_err());
        assert!(parse_amount(".").is_err());
        assert!(parse_amount("1.234").is_err());
        assert!(parse_amount("abc").is_err());
    }
}
