//! Questionnaire ingestion utilities.
//!
//! This crate loads spreadsheet workbooks into immutable
//! [`SheetSnapshot`](qfill_model::SheetSnapshot)s and computes the
//! descriptive statistics the classifiers work from.
//!
//! # Features
//!
//! - **Workbook Loading**: `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` via calamine,
//!   `.csv` via csv
//! - **Column Statistics**: average length, fill ratio, distinct ratio, type hint
//! - **Sheet Profiles**: instruction vs. requirement keyword density
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use qfill_ingest::{read_workbook, sheet_column_stats};
//!
//! let sheets = read_workbook(Path::new("rfi.xlsx"))?;
//! for sheet in &sheets {
//!     let stats = sheet_column_stats(sheet);
//! }
//! ```

mod error;
mod stats;
mod workbook;

// === Error Types ===
pub use error::{IngestError, Result};

// === Workbook Reading ===
pub use workbook::{MAX_WORKBOOK_SIZE, read_csv_sheet, read_workbook};

// === Column Statistics ===
pub use stats::{
    ANSWER_HEADER_KEYWORDS, CONTENT_INDICATORS, LONG_TEXT_THRESHOLD, QUESTION_HEADER_KEYWORDS,
    QUESTION_INDICATORS, SHORT_TEXT_THRESHOLD, SheetProfile, column_stats, header_tokens,
    keyword_hits, sample_values, sheet_column_stats, sheet_profile,
};
