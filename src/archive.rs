// src/archive.rs
use crate::error::ArchiveError;
use std::io::{Cursor, Read};
use tracing::{debug, trace};
use zip::ZipArchive;

/// Upper bound on the buffer preallocated from an entry's declared size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// A document pulled out of the archive, still as raw bytes.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub content: Vec<u8>,
}

/// True if `name` ends (case-insensitively) with one of `extensions`.
pub fn has_document_extension(name: &str, extensions: &[String]) -> bool {
    let lower = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

/// Initial buffer capacity for an entry declaring `declared` bytes. The header
/// value is untrusted, so the hint is capped.
fn capacity_hint(declared: u64) -> usize {
    declared.min(MAX_PREALLOC) as usize
}

/// Buffers every file entry whose name carries a document extension, in
/// archive listing order. Directories and other files are skipped.
pub fn read_documents(zip_bytes: &[u8], extensions: &[String]) -> Result<Vec<Document>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))?;
    let mut docs = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !entry.is_file() || !has_document_extension(&name, extensions) {
            trace!(name = %name, "skipping entry");
            continue;
        }

        let mut content = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut content)
            .map_err(|source| ArchiveError::Entry {
                name: name.clone(),
                source,
            })?;
        docs.push(Document { name, content });
    }

    debug!(entries = archive.len(), documents = docs.len(), "listed archive");
    Ok(docs)
}
