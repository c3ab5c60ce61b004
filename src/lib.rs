// src/lib.rs
//! Extracts the first table of each HTML financial statement in a ZIP archive,
//! normalizes accounting-style figures and appends growth and margin rows.

pub mod analytics;
pub mod archive;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod table;

pub use config::Config;
pub use error::{ArchiveError, ConfigError, ExtractionError, FetchError};
pub use pipeline::{process_archive, process_document, DocumentOutcome, PipelineOptions};
pub use table::{Cell, Flag, NormalizedTable, Row};
