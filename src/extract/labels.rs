// src/extract/labels.rs
use once_cell::sync::Lazy;
use regex::Regex;

/// The one column label that is never rewritten.
pub const FISCAL_YEAR_END: &str = "Fiscal Year End";

static LEADING_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}-[A-Za-z]{3}-\d{4})").expect("period date regex should compile")
});

/// Shortens a column label to its leading `31-Dec-2023` style date, dropping
/// any trailing description. Labels without a leading date, and
/// `Fiscal Year End`, are returned trimmed but otherwise unchanged.
pub fn clean_period_label(label: &str) -> String {
    let trimmed = label.trim();
    if trimmed == FISCAL_YEAR_END {
        return trimmed.to_string();
    }
    LEADING_DATE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| trimmed.to_string())
}
