//! Report generation for questionnaire runs.
//!
//! - **Extraction results**: the full [`DocumentReport`](qfill_model::DocumentReport)
//!   as JSON, reloaded later to fill the workbook again
//! - **Analysis report**: per-sheet and overall counts as JSON
//! - **Filled workbook**: the source workbook with synthesized answers set in place

mod error;
mod json;
mod xlsx;

// === Error Types ===
pub use error::{ReportError, Result};

// === JSON Reports ===
pub use json::{
    ANALYSIS_FILE, AnalysisReport, EXTRACTION_FILE, load_json, load_report, report_paths,
    save_json, write_report_outputs,
};

// === Workbook Output ===
pub use xlsx::{
    MAX_SHEET_NAME, filled_workbook_name, is_editable_source, worksheet_name,
    write_filled_workbook,
};
