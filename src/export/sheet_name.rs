// src/export/sheet_name.rs

/// Excel's limit on sheet-name length, in UTF-16 code units.
pub const MAX_SHEET_NAME_LEN: usize = 31;

fn truncate_utf16(value: &str, max_len: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in value.chars() {
        let len = ch.len_utf16();
        if used + len > max_len {
            break;
        }
        out.push(ch);
        used += len;
    }
    out
}

fn taken(candidate: &str, existing: &[String]) -> bool {
    existing.iter().any(|e| {
        e.chars()
            .flat_map(char::to_uppercase)
            .eq(candidate.chars().flat_map(char::to_uppercase))
    })
}

/// Turns a document name into a valid, unique sheet name.
///
/// `: \ / ? * [ ]` become `_`, leading and trailing apostrophes are dropped,
/// the result is cut to 31 UTF-16 units, and a ` (n)` suffix is added when the
/// name is already used (compared case-insensitively). Empty names fall back to
/// `Sheet<n>`.
pub fn sanitize_sheet_name(original: &str, sheet_number: usize, existing: &[String]) -> String {
    let cleaned: String = original
        .replace('\0', "")
        .trim()
        .chars()
        .map(|ch| match ch {
            ':' | '\\' | '/' | '?' | '*' | '[' | ']' => '_',
            other => other,
        })
        .collect();

    let mut base = truncate_utf16(cleaned.trim_matches('\''), MAX_SHEET_NAME_LEN);
    base = base.trim_matches('\'').to_string();
    if base.trim().is_empty() {
        base = format!("Sheet{}", sheet_number);
    }

    if !taken(&base, existing) {
        return base;
    }

    let mut n = 2usize;
    loop {
        let suffix = format!(" ({})", n);
        let room = MAX_SHEET_NAME_LEN.saturating_sub(suffix.encode_utf16().count());
        let candidate = format!("{}{}", truncate_utf16(&base, room), suffix);
        if !taken(&candidate, existing) {
            return candidate;
        }
        n += 1;
    }
}
