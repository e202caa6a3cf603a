use std::path::PathBuf;

use qfill_model::DocumentReport;

/// Outcome of an `extract`, `fill` or `run` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub report: DocumentReport,
    /// Name of the oracle consulted, `offline` when none was.
    pub oracle: String,
    pub output_dir: PathBuf,
    pub report_files: Vec<PathBuf>,
    pub filled_workbook: Option<PathBuf>,
    pub filled_cells: usize,
}
