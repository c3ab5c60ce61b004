// src/export/mod.rs
//! Spreadsheet export: one worksheet per successfully extracted table, in
//! archive order.

pub mod sheet_name;
pub mod xlsx;

use crate::pipeline::DocumentOutcome;
use anyhow::{Context, Result};
use std::{fs, io::Cursor, path::Path};
use tracing::{debug, info, instrument};

pub use sheet_name::sanitize_sheet_name;
pub use xlsx::Sheet;

/// Assigns sheet names to the successful outcomes. Failed documents get no
/// sheet.
pub fn plan_sheets(outcomes: &[DocumentOutcome]) -> Vec<Sheet<'_>> {
    let mut names: Vec<String> = Vec::new();
    let mut sheets = Vec::new();
    for outcome in outcomes {
        let Some(table) = outcome.table() else {
            debug!(document = %outcome.name, "no sheet for failed document");
            continue;
        };
        let name = sanitize_sheet_name(&outcome.name, sheets.len() + 1, &names);
        names.push(name.clone());
        sheets.push(Sheet { name, table });
    }
    sheets
}

/// Renders the workbook in memory. Returns the bytes and the sheet names.
pub fn workbook_bytes(outcomes: &[DocumentOutcome]) -> Result<(Vec<u8>, Vec<String>)> {
    let sheets = plan_sheets(outcomes);
    let cursor = xlsx::write_package(Cursor::new(Vec::new()), &sheets)?;
    let names = sheets.into_iter().map(|s| s.name).collect();
    Ok((cursor.into_inner(), names))
}

/// Writes the workbook to `path` and returns the sheet names written.
#[instrument(level = "info", skip(outcomes), fields(path = %path.display()))]
pub fn write_workbook_file(path: &Path, outcomes: &[DocumentOutcome]) -> Result<Vec<String>> {
    let (bytes, names) = workbook_bytes(outcomes)?;
    fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
    info!(sheets = names.len(), bytes = bytes.len(), "workbook written");
    Ok(names)
}
