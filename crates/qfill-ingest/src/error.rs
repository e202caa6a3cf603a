//! Error types for workbook ingestion.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a questionnaire workbook.
#[derive(Debug, Error)]
pub enum IngestError {
    // === File System Errors ===
    /// Workbook file not found.
    #[error("workbook not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exceeds the configured size limit.
    #[error("file {path} is {size} bytes, limit is {max_size}")]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// Extension is not a supported spreadsheet format.
    #[error("unsupported workbook format '{extension}' for {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    // === Parsing Errors ===
    /// Spreadsheet container could not be parsed.
    #[error("failed to parse workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    /// A single sheet could not be read.
    #[error("failed to read sheet '{sheet}' in {path}: {message}")]
    Sheet {
        path: PathBuf,
        sheet: String,
        message: String,
    },

    /// CSV record could not be parsed.
    #[error("failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The workbook holds no sheet with any content.
    #[error("workbook has no non-empty sheets: {path}")]
    EmptyWorkbook { path: PathBuf },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
