// src/extract/grid.rs
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

/// Spans beyond this are treated as malformed markup and clamped.
const MAX_SPAN: usize = 1000;

/// A `<td>`/`<th>` as it appears in the markup, before span expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub text: String,
    pub is_header: bool,
    pub colspan: usize,
    pub rowspan: usize,
}

/// A `<tr>` of the located table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub cells: Vec<RawCell>,
    /// The row sits inside `<thead>`.
    pub in_thead: bool,
}

impl RawRow {
    pub fn all_header_cells(&self) -> bool {
        !self.cells.is_empty() && self.cells.iter().all(|c| c.is_header)
    }
}

/// Collects the rows of the first `<table>` in `html`, in document order.
/// Returns `None` when the document has no table at all.
///
/// Only rows that belong to that table are returned; rows of nested tables are
/// skipped.
pub fn first_table_rows(html: &str) -> Option<Vec<RawRow>> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("table").expect("table selector should parse");
    let table = document.select(&selector).next()?;

    let mut rows = Vec::new();
    for child in element_children(table) {
        match child.value().name() {
            "tr" => rows.push(read_row(child, false)),
            section @ ("thead" | "tbody" | "tfoot") => {
                let in_thead = section == "thead";
                for tr in element_children(child).filter(|e| e.value().name() == "tr") {
                    rows.push(read_row(tr, in_thead));
                }
            }
            _ => {}
        }
    }
    trace!(rows = rows.len(), "collected table rows");
    Some(rows)
}

fn element_children(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.children().filter_map(ElementRef::wrap)
}

fn read_row(tr: ElementRef<'_>, in_thead: bool) -> RawRow {
    let cells = element_children(tr)
        .filter_map(|cell| {
            let name = cell.value().name();
            if name != "td" && name != "th" {
                return None;
            }
            Some(RawCell {
                text: cell_text(cell),
                is_header: name == "th",
                colspan: span_attr(cell, "colspan"),
                rowspan: span_attr(cell, "rowspan"),
            })
        })
        .collect();
    RawRow { cells, in_thead }
}

/// Descendant text with whitespace runs collapsed to single spaces.
fn cell_text(cell: ElementRef<'_>) -> String {
    let joined: String = cell.text().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn span_attr(cell: ElementRef<'_>, attr: &str) -> usize {
    cell.value()
        .attr(attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(MAX_SPAN))
        .unwrap_or(1)
}

/// Emits owed rowspan text for consecutive columns starting at `col`.
fn drain_pending(out: &mut Vec<String>, col: &mut usize, pending: &mut [Option<(String, usize)>]) {
    while let Some(Some((text, remaining))) = pending.get_mut(*col) {
        out.push(text.clone());
        *remaining -= 1;
        if *remaining == 0 {
            pending[*col] = None;
        }
        *col += 1;
    }
}

/// Expands `colspan`/`rowspan` into a rectangular grid of cell texts. Spanned
/// positions repeat the originating text; short rows are padded with empty
/// strings up to the widest row.
pub fn expand_spans(rows: &[RawRow]) -> Vec<Vec<String>> {
    // Per column: text still owed to the rows below, and how many rows remain.
    let mut pending: Vec<Option<(String, usize)>> = Vec::new();
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(rows.len());

    for row in rows {
        let mut out: Vec<String> = Vec::new();
        let mut col = 0;

        for cell in &row.cells {
            drain_pending(&mut out, &mut col, &mut pending);
            for _ in 0..cell.colspan {
                out.push(cell.text.clone());
                if cell.rowspan > 1 {
                    if pending.len() <= col {
                        pending.resize(col + 1, None);
                    }
                    pending[col] = Some((cell.text.clone(), cell.rowspan - 1));
                }
                col += 1;
            }
        }
        drain_pending(&mut out, &mut col, &mut pending);
        grid.push(out);
    }

    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, String::new());
    }
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: &str, colspan: usize, rowspan: usize) -> RawCell {
        RawCell {
            text: text.into(),
            is_header: true,
            colspan,
            rowspan,
        }
    }

    #[test]
    fn test_first_table_only_and_nested_rows_skipped() {
        let html = r#"
            <html><body>
            <p>intro</p>
            <table>
              <tr><th>A</th><th>B</th></tr>
              <tr><td>x <b>bold</b></td><td><table><tr><td>inner</td></tr></table></td></tr>
            </table>
            <table><tr><td>second</td></tr></table>
            </body></html>"#;
        let rows = first_table_rows(html).expect("table present");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].all_header_cells());
        assert_eq!(rows[1].cells[0].text, "x bold");
        assert_eq!(rows[1].cells[1].text, "inner");
    }

    #[test]
    fn test_no_table() {
        assert!(first_table_rows("<html><body><p>nothing</p></body></html>").is_none());
    }

    #[test]
    fn test_thead_rows_are_marked() {
        let html = "<table><thead><tr><td>H</td></tr></thead><tbody><tr><td>1</td></tr></tbody></table>";
        let rows = first_table_rows(html).expect("table present");
        assert!(rows[0].in_thead);
        assert!(!rows[1].in_thead);
    }

    #[test]
    fn test_expand_colspan_and_rowspan() {
        let rows = vec![
            RawRow {
                cells: vec![raw("Item", 1, 2), raw("2023", 2, 1)],
                in_thead: true,
            },
            RawRow {
                cells: vec![raw("Q1", 1, 1), raw("Q2", 1, 1)],
                in_thead: true,
            },
            RawRow {
                cells: vec![raw("Revenue", 1, 1)],
                in_thead: false,
            },
        ];
        let grid = expand_spans(&rows);
        assert_eq!(grid[0], vec!["Item", "2023", "2023"]);
        assert_eq!(grid[1], vec!["Item", "Q1", "Q2"]);
        assert_eq!(grid[2], vec!["Revenue", "", ""]);
    }
}
