// src/extract/header.rs
use super::grid::RawRow;
use tracing::debug;

/// Default second-level header texts that collapse a two-level header to its
/// first level.
pub const DEFAULT_HEADER_EXCLUSIONS: &[&str] = &["legal regulation", "audit status", "nan"];

/// Exclusions that must equal the second level. The rest match anywhere in it.
const EXACT_EXCLUSIONS: &[&str] = &["nan"];

/// The shape a table header was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    Flat,
    TwoLevel,
}

/// How many leading rows form the header. Strategies, in order: rows inside
/// `<thead>`, leading rows made only of `<th>` cells, and finally the first row.
pub fn header_row_count(rows: &[RawRow]) -> usize {
    let thead = rows.iter().take_while(|r| r.in_thead).count();
    if thead > 0 {
        debug!(rows = thead, "header from <thead>");
        return thead;
    }
    // A table made only of <th> rows still keeps its last row as data.
    let th_rows = rows.iter().take_while(|r| r.all_header_cells()).count();
    let th_rows = th_rows.min(rows.len().saturating_sub(1).max(1));
    if th_rows > 0 {
        debug!(rows = th_rows, "header from leading <th> rows");
        return th_rows;
    }
    debug!("header falls back to first row");
    rows.len().min(1)
}

/// Collapses the header rows of a span-expanded grid into one label per column.
///
/// One row gives the labels directly. With two levels, a column whose second
/// level is empty, repeats the first level, or matches `exclusions`
/// (case-insensitive) keeps the first level alone; other columns join both
/// levels with a space. Only the second level is matched against `exclusions`.
/// Levels past the second are folded into the joined label.
pub fn resolve_labels(
    header: &[Vec<String>],
    exclusions: &[String],
    collapse_excluded: bool,
) -> (Vec<String>, HeaderShape) {
    let width = header.first().map(Vec::len).unwrap_or(0);
    if header.len() <= 1 {
        let labels = header
            .first()
            .map(|r| r.iter().map(|s| s.trim().to_string()).collect())
            .unwrap_or_default();
        return (labels, HeaderShape::Flat);
    }

    let labels = (0..width)
        .map(|col| {
            let first = header[0][col].trim();
            let level_two = header[1][col].trim();
            let second = header[1..]
                .iter()
                .map(|r| r[col].trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");

            if second.is_empty()
                || second == first
                || (collapse_excluded && matches_exclusion(level_two, exclusions))
            {
                first.to_string()
            } else if first.is_empty() {
                second
            } else {
                format!("{} {}", first, second)
            }
        })
        .collect();
    (labels, HeaderShape::TwoLevel)
}

fn matches_exclusion(level: &str, exclusions: &[String]) -> bool {
    let level = level.to_lowercase();
    exclusions.iter().any(|e| {
        let e = e.trim().to_lowercase();
        if EXACT_EXCLUSIONS.contains(&e.as_str()) {
            level == e
        } else {
            !e.is_empty() && level.contains(&e)
        }
    })
}

/// Makes labels unique and non-empty. Empty labels become `Unnamed: <i>`;
/// repeats get `.1`, `.2`, ... appended in order of appearance.
pub fn dedup_labels(labels: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(labels.len());
    for (i, label) in labels.into_iter().enumerate() {
        let base = if label.trim().is_empty() {
            format!("Unnamed: {}", i)
        } else {
            label
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::grid::RawCell;

    fn exclusions() -> Vec<String> {
        DEFAULT_HEADER_EXCLUSIONS.iter().map(|s| s.to_string()).collect()
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_flat_header() {
        let (labels, shape) = resolve_labels(&grid(&[&["Item", " 2022 ", "2023"]]), &exclusions(), true);
        assert_eq!(shape, HeaderShape::Flat);
        assert_eq!(labels, vec!["Item", "2022", "2023"]);
    }

    #[test]
    fn test_two_level_exclusions_collapse() {
        let header = grid(&[
            &["Fiscal Year End", "31-Dec-2022", "31-Dec-2023"],
            &["Audit Status", "Q1", ""],
        ]);
        let (labels, shape) = resolve_labels(&header, &exclusions(), true);
        assert_eq!(shape, HeaderShape::TwoLevel);
        assert_eq!(labels, vec!["Fiscal Year End", "31-Dec-2022 Q1", "31-Dec-2023"]);
    }

    #[test]
    fn test_two_level_legal_regulation_and_nan() {
        let header = grid(&[&["A", "B"], &["LEGAL REGULATION", "nan"]]);
        let (labels, _) = resolve_labels(&header, &exclusions(), true);
        assert_eq!(labels, vec!["A", "B"]);
    }

    #[test]
    fn test_exclusions_match_within_second_level() {
        let header = grid(&[
            &["Fiscal Year End", "31-Dec-2022", "Growth"],
            &["Audit Status:", "Applicable legal regulation", "Financial"],
        ]);
        let (labels, _) = resolve_labels(&header, &exclusions(), true);
        // "nan" only matches a whole level, never part of "Financial"
        assert_eq!(labels, vec!["Fiscal Year End", "31-Dec-2022", "Growth Financial"]);
    }

    #[test]
    fn test_three_levels_match_on_second_level_only() {
        let header = grid(&[
            &["Fiscal Year End", "31-Dec-2022"],
            &["Audit Status", "Audited"],
            &["Legal Regulation", "VAS"],
        ]);
        let (labels, _) = resolve_labels(&header, &exclusions(), true);
        assert_eq!(labels, vec!["Fiscal Year End", "31-Dec-2022 Audited VAS"]);
    }

    #[test]
    fn test_two_level_without_collapse_joins_everything() {
        let header = grid(&[&["31-Dec-2023"], &["Audit Status"]]);
        let (labels, _) = resolve_labels(&header, &exclusions(), false);
        assert_eq!(labels, vec!["31-Dec-2023 Audit Status"]);
    }

    #[test]
    fn test_rowspan_fill_is_not_doubled() {
        let header = grid(&[&["Item", "2023"], &["Item", "Q4"]]);
        let (labels, _) = resolve_labels(&header, &exclusions(), true);
        assert_eq!(labels, vec!["Item", "2023 Q4"]);
    }

    #[test]
    fn test_dedup_labels() {
        let labels = dedup_labels(vec![
            "A".into(),
            "A".into(),
            "".into(),
            "A".into(),
        ]);
        assert_eq!(labels, vec!["A", "A.1", "Unnamed: 2", "A.2"]);
    }

    #[test]
    fn test_header_row_count_strategies() {
        let cell = |h: bool| RawCell {
            text: "x".into(),
            is_header: h,
            colspan: 1,
            rowspan: 1,
        };
        let row = |h: bool, thead: bool| RawRow {
            cells: vec![cell(h), cell(h)],
            in_thead: thead,
        };

        assert_eq!(header_row_count(&[row(false, true), row(false, false)]), 1);
        assert_eq!(header_row_count(&[row(true, false), row(true, false), row(false, false)]), 2);
        assert_eq!(header_row_count(&[row(false, false), row(false, false)]), 1);
        assert_eq!(header_row_count(&[]), 0);
    }
}
