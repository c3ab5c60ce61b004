// src/extract/mod.rs
//! Locates the first `<table>` of an HTML document and normalizes it into a
//! [`NormalizedTable`].

pub mod grid;
pub mod header;
pub mod labels;

use crate::decode::{clean_label, decode};
use crate::error::ExtractionError;
use crate::pipeline::PipelineOptions;
use crate::table::{Cell, NormalizedTable, Row};
use tracing::{debug, instrument, trace};

/// Rows whose label contains this (case-insensitive) are section headers in the
/// source documents, not data.
const LEGAL_REGULATION: &str = "legal regulation";

/// Extracts and normalizes the first table of `html`.
///
/// Later tables are ignored. Cells that fail to decode become
/// [`Cell::Missing`]; only a missing or structurally unusable table fails the
/// document.
#[instrument(level = "debug", skip(html, options), fields(html_len = html.len()))]
pub fn normalize(html: &str, options: &PipelineOptions) -> Result<NormalizedTable, ExtractionError> {
    let raw_rows = grid::first_table_rows(html).ok_or(ExtractionError::NoTableFound)?;
    if raw_rows.is_empty() {
        return Err(ExtractionError::MalformedTable(
            "table has no <tr> rows".to_string(),
        ));
    }

    let header_rows = header::header_row_count(&raw_rows);
    let expanded = grid::expand_spans(&raw_rows);
    let width = expanded.first().map(Vec::len).unwrap_or(0);
    if width == 0 || header_rows == 0 {
        return Err(ExtractionError::MalformedTable(format!(
            "no columns could be derived from {} rows",
            raw_rows.len()
        )));
    }
    if expanded.len() <= header_rows {
        return Err(ExtractionError::MalformedTable(format!(
            "table has {} header rows and no body rows",
            header_rows
        )));
    }

    let (raw_labels, shape) = header::resolve_labels(
        &expanded[..header_rows],
        &options.header_exclusions,
        options.collapse_excluded_subheaders,
    );
    let cleaned = if options.clean_period_labels {
        raw_labels
            .iter()
            .map(|l| labels::clean_period_label(l))
            .collect()
    } else {
        raw_labels
    };
    let columns = header::dedup_labels(cleaned);
    debug!(?shape, columns = columns.len(), header_rows, "resolved header");

    let mut rows = Vec::with_capacity(expanded.len() - header_rows);
    for raw in &expanded[header_rows..] {
        let mut cells = Vec::with_capacity(width);
        cells.push(Cell::Text(clean_label(&raw[0])));
        cells.extend(raw[1..].iter().map(|text| Cell::from_option(decode(text))));

        let row = Row::new(cells);
        if options.filter_legal_regulation && is_legal_regulation(row.label()) {
            trace!(label = row.label(), "dropping section row");
            continue;
        }
        rows.push(row);
    }

    debug!(rows = rows.len(), "normalized table");
    Ok(NormalizedTable::new(columns, rows))
}

fn is_legal_regulation(label: &str) -> bool {
    label.to_lowercase().contains(LEGAL_REGULATION)
}
