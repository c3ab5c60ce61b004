// src/error.rs
use thiserror::Error;

/// Per-document extraction failure. Never fatal to the run: the pipeline
/// attaches it to the document name and carries on with the siblings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no <table> element found in document")]
    NoTableFound,

    #[error("table could not be resolved: {0}")]
    MalformedTable(String),
}

/// The archive bytes could not be opened or listed.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("not a valid ZIP archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("reading entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to obtain the archive bytes from its source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file id or share URL: {0}")]
    InvalidFileId(String),

    #[error("downloaded content is not a ZIP archive ({0} bytes)")]
    NotAnArchive(usize),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
}
