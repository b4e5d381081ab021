//! Market-value text parsing.
//!
//! Search results and profile headers carry values like `€25.00m`,
//! `€400k`, or `$1.5m`. Parsing strips the currency symbol and applies a
//! fixed unit-suffix table (m = million, k = thousand).

use regex::Regex;
use std::sync::OnceLock;

fn magnitude_regex() -> &'static Regex {
    static MAGNITUDE: OnceLock<Regex> = OnceLock::new();
    MAGNITUDE.get_or_init(|| {
        Regex::new(r"^([0-9]+(?:[.,][0-9]+)?)([mMkK])?$").expect("valid regex")
    })
}

fn fragment_regex() -> &'static Regex {
    static FRAGMENT: OnceLock<Regex> = OnceLock::new();
    FRAGMENT.get_or_init(|| Regex::new(r"[€$£]\s*[0-9][0-9.,]*\s*[mkMK]?").expect("valid regex"))
}

/// Find a currency-value fragment inside arbitrary text.
///
/// Rendered pages wrap the value in surrounding prose ("€25.00m Last
/// update ..."); this pulls out just the value portion.
#[must_use]
pub fn extract_value_fragment(text: &str) -> Option<String> {
    fragment_regex()
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}

/// Convert market-value text to a plain integer.
///
/// Returns `None` for blank, null-like, or unrecognizable input. A
/// separator followed by exactly three digits with no unit suffix is
/// treated as a thousands separator (`€138,000` is 138000, not 138).
#[must_use]
pub fn parse_value_text(value: &str) -> Option<u64> {
    let s = value.trim();
    if s.is_empty()
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("nan")
    {
        return None;
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, '€' | '$' | '£') && !c.is_whitespace())
        .collect();

    if let Some(captures) = magnitude_regex().captures(&cleaned) {
        let number = captures.get(1).map(|m| m.as_str())?;
        let suffix = captures.get(2).map(|m| m.as_str());

        if suffix.is_none() {
            if let Some((head, tail)) = number.split_once(|c| c == '.' || c == ',') {
                if tail.len() == 3 {
                    return format!("{head}{tail}").parse().ok();
                }
            }
        }

        let base: f64 = number.replace(',', ".").parse().ok()?;
        let scale = match suffix {
            Some("m" | "M") => 1_000_000.0,
            Some("k" | "K") => 1_000.0,
            _ => 1.0,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Some((base * scale).round() as u64);
    }

    // Last resort: keep the digits only.
    let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
