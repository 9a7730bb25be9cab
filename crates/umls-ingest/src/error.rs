//! Error types for UMLS ingestion.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while reading reference tables and extractor output.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Input file does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file.
    #[error("not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Failed to open, seek, or read a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    /// The delimited reader failed mid-file.
    #[error("failed to read delimited records from {path}: {source}")]
    Delimited {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Extractor documents are not valid JSON of the expected shape.
    #[error("failed to parse documents {path} (line {line}): {source}")]
    Documents {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    // === Scan Control ===
    /// The scan was cancelled through its [`ScanControl`](crate::ScanControl).
    #[error("reference scan cancelled")]
    Cancelled,

    /// The scan ran past its deadline.
    #[error("reference scan exceeded its deadline after {elapsed_ms} ms")]
    DeadlineExceeded { elapsed_ms: u128 },
}

impl IngestError {
    pub(crate) fn file_read(path: &Path, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Map an open error, distinguishing a missing file from other failures.
    pub(crate) fn open(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::file_read(path, source)
        }
    }

    /// True for errors raised because the scan was stopped on request.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
