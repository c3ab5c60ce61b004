// src/pipeline.rs
use crate::analytics::derive_analytics;
use crate::archive::{read_documents, Document};
use crate::error::{ArchiveError, ExtractionError};
use crate::extract::{header::DEFAULT_HEADER_EXCLUSIONS, normalize};
use crate::table::NormalizedTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Behavioural switches for the extraction pipeline. Defaults enable every
/// cleanup step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Two-level headers whose second level is in `header_exclusions` keep the
    /// first level only.
    pub collapse_excluded_subheaders: bool,
    pub header_exclusions: Vec<String>,
    /// Drop rows whose label mentions "Legal Regulation".
    pub filter_legal_regulation: bool,
    /// Rewrite column labels to their leading `31-Dec-2023` style date.
    pub clean_period_labels: bool,
    /// Append growth and margin rows.
    pub derive_analytics: bool,
    /// Process documents on the rayon pool. Output order is unaffected.
    pub parallel: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            collapse_excluded_subheaders: true,
            header_exclusions: DEFAULT_HEADER_EXCLUSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            filter_legal_regulation: true,
            clean_period_labels: true,
            derive_analytics: true,
            parallel: true,
        }
    }
}

/// The outcome for one document of an archive: its table, or why there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutcome {
    pub name: String,
    pub result: Result<NormalizedTable, ExtractionError>,
}

impl DocumentOutcome {
    pub fn table(&self) -> Option<&NormalizedTable> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ExtractionError> {
        self.result.as_ref().err()
    }
}

/// Normalizes one HTML document and, if enabled, appends the analytics rows.
pub fn process_document(
    html: &str,
    options: &PipelineOptions,
) -> Result<NormalizedTable, ExtractionError> {
    let table = normalize(html, options)?;
    if options.derive_analytics {
        Ok(derive_analytics(&table))
    } else {
        Ok(table)
    }
}

fn process_one(doc: &Document, options: &PipelineOptions) -> DocumentOutcome {
    let html = String::from_utf8_lossy(&doc.content);
    let result = process_document(&html, options);
    if let Err(e) = &result {
        warn!(document = %doc.name, error = %e, "document failed");
    }
    DocumentOutcome {
        name: doc.name.clone(),
        result,
    }
}

/// Processes already-listed documents, preserving their order.
pub fn process_documents(docs: &[Document], options: &PipelineOptions) -> Vec<DocumentOutcome> {
    if options.parallel {
        docs.par_iter().map(|d| process_one(d, options)).collect()
    } else {
        docs.iter().map(|d| process_one(d, options)).collect()
    }
}

/// Opens ZIP bytes, selects documents by extension and processes each one.
///
/// Only an unreadable archive fails the call; a document that cannot be
/// extracted is reported in its [`DocumentOutcome`] alongside its siblings.
#[instrument(level = "info", skip(zip_bytes, extensions, options), fields(bytes = zip_bytes.len()))]
pub fn process_archive(
    zip_bytes: &[u8],
    extensions: &[String],
    options: &PipelineOptions,
) -> Result<Vec<DocumentOutcome>, ArchiveError> {
    let start = Instant::now();
    let docs = read_documents(zip_bytes, extensions)?;
    let outcomes = process_documents(&docs, options);

    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!(
        documents = outcomes.len(),
        ok,
        failed = outcomes.len() - ok,
        elapsed = ?start.elapsed(),
        "processed archive"
    );
    Ok(outcomes)
}
