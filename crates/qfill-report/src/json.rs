//! JSON report persistence.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use qfill_model::{AnalysisSummary, DocumentReport, GlobalContext};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ReportError, Result};

/// Full document report, reloaded by `fill`.
pub const EXTRACTION_FILE: &str = "extraction_results.json";
/// Summary counts for people.
pub const ANALYSIS_FILE: &str = "analysis_report.json";

/// The analysis summary together with when and how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    /// Name of the oracle consulted, `offline` when none was.
    pub oracle: String,
    pub hierarchy_oracle: bool,
    pub global_context: GlobalContext,
    #[serde(flatten)]
    pub summary: AnalysisSummary,
}

impl AnalysisReport {
    pub fn new(report: &DocumentReport, oracle: impl Into<String>, hierarchy_oracle: bool) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            oracle: oracle.into(),
            hierarchy_oracle,
            global_context: report.global_context.clone(),
            summary: report.summary(),
        }
    }
}

/// Serialize `value` as pretty JSON, writing to a temp file first and
/// renaming it over `path`.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ReportError::Json {
        operation: "encode",
        path: path.to_path_buf(),
        source,
    })?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = File::create(&temp_path).map_err(|source| ReportError::Io {
        operation: "create",
        path: temp_path.clone(),
        source,
    })?;
    file.write_all(&bytes).map_err(|source| ReportError::Io {
        operation: "write",
        path: temp_path.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| ReportError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| ReportError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|source| ReportError::Io {
        operation: "open",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| ReportError::Json {
        operation: "decode",
        path: path.to_path_buf(),
        source,
    })
}

/// Load a [`DocumentReport`] from a report file or from a directory
/// holding [`EXTRACTION_FILE`].
pub fn load_report(path: &Path) -> Result<DocumentReport> {
    let file = if path.is_dir() {
        path.join(EXTRACTION_FILE)
    } else {
        path.to_path_buf()
    };
    if !file.is_file() {
        return Err(ReportError::NotFound { path: file });
    }
    let report: DocumentReport = load_json(&file)?;
    info!(path = %file.display(), sheets = report.sheets.len(), "Loaded report");
    Ok(report)
}

/// Paths of the two report files inside an output directory.
pub fn report_paths(output_dir: &Path) -> (PathBuf, PathBuf) {
    (output_dir.join(EXTRACTION_FILE), output_dir.join(ANALYSIS_FILE))
}

/// Write the full report and the analysis summary into `output_dir`.
pub fn write_report_outputs(
    output_dir: &Path,
    report: &DocumentReport,
    analysis: &AnalysisReport,
) -> anyhow::Result<Vec<PathBuf>> {
    use anyhow::Context;

    let (extraction, summary) = report_paths(output_dir);
    save_json(report, &extraction)
        .with_context(|| format!("write {}", extraction.display()))?;
    save_json(analysis, &summary).with_context(|| format!("write {}", summary.display()))?;
    info!(dir = %output_dir.display(), "Wrote report files");
    Ok(vec![extraction, summary])
}
