use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Could not identify archive format of {filename}")]
    UnknownFormat { filename: String },

    #[error("Could not extract {filename}: {format:?} archives are not supported")]
    UnsupportedFormat {
        filename: String,
        format: super::ArchiveFormat,
    },

    #[error("Invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Destination is not absolute: {resolved:?} (from {template:?})")]
    RelativeDestination { template: String, resolved: String },

    #[error("Size mismatch extracting {path}: expected {expected} bytes, wrote {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Extraction task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
