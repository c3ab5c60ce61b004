// src/decode.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// Leading numbering such as `(3).`, `1.` or `12)` at the start of a row label.
static LEADING_NUMBERING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([(\d][\d().,]*)").expect("numbering regex should compile"));

/// Decodes accounting-notation text into a number.
///
/// The source documents use `.` as a thousands separator and wrap negatives in
/// parentheses, so `"(1.234)"` is `-1234`. Commas are treated as noise. Text that
/// still does not parse, or parses to a non-finite value, yields `None`.
///
/// Intentionally not locale aware: standard decimal-point text such as `"1.5"`
/// decodes to `15`.
pub fn decode(cell_text: &str) -> Option<f64> {
    let cleaned: String = cell_text
        .trim()
        .chars()
        .filter(|c| *c != '.' && *c != ',' && *c != ')')
        .map(|c| if c == '(' { '-' } else { c })
        .collect();

    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Strips the numbering notation prefixed to row labels, keeping its digits:
/// `"(3). Net Revenue"` becomes `"3 Net Revenue"`. Labels without a leading
/// numeric token are only trimmed.
pub fn clean_label(label: &str) -> String {
    let trimmed = label.trim();
    let Some(caps) = LEADING_NUMBERING.captures(trimmed) else {
        return trimmed.to_string();
    };
    let token = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    if !token.chars().any(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    // A bare number only counts as numbering when a space or the end follows,
    // so dates and percentages keep their text.
    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let punctuated = token.contains(['(', ')', '.']);
    let separated = trimmed[end..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace);
    if !punctuated && !separated {
        return trimmed.to_string();
    }

    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    let rest = trimmed[end..].trim();
    if rest.is_empty() {
        digits
    } else {
        format!("{} {}", digits, rest)
    }
}
