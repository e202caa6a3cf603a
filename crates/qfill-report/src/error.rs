//! Error types for report persistence and workbook output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while saving or loading reports and writing workbooks.
#[derive(Debug, Error)]
pub enum ReportError {
    /// File system operation failed.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temp file could not be moved over the target.
    #[error("failed to replace {target_path} with {temp_path}: {source}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("failed to {operation} JSON {path}: {source}")]
    Json {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No report at the given location.
    #[error("report not found: {path}")]
    NotFound { path: PathBuf },

    /// The workbook could not be loaded or saved.
    #[error("failed to process workbook {path}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: umya_spreadsheet::XlsxError,
    },

    /// A filled sheet is missing from the source workbook.
    #[error("sheet '{sheet}' not found in the source workbook")]
    SheetNotFound { sheet: String },

    /// A worksheet could not be added to a rebuilt workbook.
    #[error("failed to create sheet '{sheet}': {detail}")]
    SheetCreate { sheet: String, detail: String },

    /// A cell position does not fit in a worksheet.
    #[error("cell ({row}, {column}) of sheet '{sheet}' is outside worksheet limits")]
    CellOutOfRange {
        sheet: String,
        row: usize,
        column: usize,
    },
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
