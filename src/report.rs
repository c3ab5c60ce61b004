// src/report.rs
//! JSON rendering of a run, for consumers that display the tables.

use crate::pipeline::DocumentOutcome;
use crate::table::NormalizedTable;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, path::Path};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub documents: Vec<DocumentEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct DocumentEntry<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub body: EntryBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EntryBody<'a> {
    Table(&'a NormalizedTable),
    Error { error: String },
}

impl<'a> Report<'a> {
    pub fn new(outcomes: &'a [DocumentOutcome], generated_at: DateTime<Utc>) -> Self {
        let documents = outcomes
            .iter()
            .map(|o| DocumentEntry {
                name: &o.name,
                body: match &o.result {
                    Ok(table) => EntryBody::Table(table),
                    Err(e) => EntryBody::Error {
                        error: e.to_string(),
                    },
                },
            })
            .collect();
        Self {
            generated_at,
            documents,
        }
    }
}

pub fn to_json(outcomes: &[DocumentOutcome]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report::new(outcomes, Utc::now()))?)
}

pub fn write_report_file(path: &Path, outcomes: &[DocumentOutcome]) -> Result<()> {
    let json = to_json(outcomes)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), documents = outcomes.len(), "report written");
    Ok(())
}
