use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or querying the taxon index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read checklist archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("checklist archive has no {0} entry")]
    MissingEntry(&'static str),
    #[error("failed to parse checklist row: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("search engine error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("stored usage payload error: {0}")]
    UsagePayload(#[from] serde_json::Error),
}
