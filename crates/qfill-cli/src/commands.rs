use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, info_span, trace, warn};

use qfill_cli::logging::redact_value;
use qfill_cli::types::RunResult;
use qfill_core::{OracleSettings, PipelineContext, ProcessingOptions, extract_file, fill_document};
use qfill_ingest::read_workbook;
use qfill_model::{DocumentReport, SheetSnapshot};
use qfill_oracle::HttpOracle;
use qfill_report::{
    AnalysisReport, filled_workbook_name, load_report, write_filled_workbook,
    write_report_outputs,
};

use crate::cli::{EngineArgs, ExtractArgs, FillArgs, InspectArgs};
use crate::progress;

/// Build the pipeline context from engine flags.
///
/// The run is offline unless an oracle URL is configured and `--offline`
/// is not set.
pub fn build_context(engine: &EngineArgs) -> Result<PipelineContext> {
    let timeout = Duration::from_secs(engine.oracle_timeout_secs.max(1));
    let options = ProcessingOptions::new()
        .with_hierarchy_oracle(!engine.no_hierarchy_oracle)
        .with_content_sheet(engine.content_sheet.clone())
        .with_force_non_empty(engine.force_non_empty)
        .with_distribution(engine.distribution.clone())
        .with_seed_salt(engine.seed)
        .with_max_parallel_sheets(engine.jobs)
        .with_oracle(
            OracleSettings::default()
                .with_timeout(timeout)
                .with_max_retries(engine.oracle_retries)
                .with_max_concurrent(engine.oracle_concurrency),
        );
    let ctx = PipelineContext::new(options);
    match (&engine.oracle_url, engine.offline) {
        (Some(url), false) => {
            let oracle = HttpOracle::new(url.clone(), engine.oracle_token.clone(), timeout)
                .with_context(|| format!("configure oracle at {url}"))?;
            info!(endpoint = %url, "Using HTTP oracle");
            Ok(ctx.with_oracle(oracle))
        }
        (Some(_), true) => {
            debug!("Oracle URL ignored in offline mode");
            Ok(ctx)
        }
        (None, _) => Ok(ctx),
    }
}

fn default_output_dir(workbook: &Path) -> PathBuf {
    let stem = workbook
        .file_stem()
        .map_or_else(|| "questionnaire".into(), |s| s.to_string_lossy().into_owned());
    workbook
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{stem}_qfill"))
}

fn extract(
    ctx: &PipelineContext,
    workbook: &Path,
) -> Result<(Vec<SheetSnapshot>, DocumentReport)> {
    let spinner = progress::stage(format!("Analysing {}", workbook.display()));
    let result = extract_file(ctx, workbook);
    spinner.finish_and_clear();
    result
}

fn write_reports(
    ctx: &PipelineContext,
    output_dir: &Path,
    report: &DocumentReport,
) -> Result<Vec<PathBuf>> {
    let analysis = AnalysisReport::new(report, ctx.oracle_name(), ctx.options.hierarchy_oracle);
    write_report_outputs(output_dir, report, &analysis)
}

fn write_filled(
    ctx: &PipelineContext,
    output_dir: &Path,
    workbook: &Path,
    sheets: &[SheetSnapshot],
    report: &mut DocumentReport,
) -> Result<(PathBuf, usize)> {
    let spinner = progress::stage("Synthesizing responses");
    fill_document(ctx, report);
    spinner.finish_and_clear();

    let path = output_dir.join(filled_workbook_name(&report.source));
    let cells = write_filled_workbook(workbook, &path, sheets, report)
        .with_context(|| format!("write {}", path.display()))?;
    Ok((path, cells))
}

pub fn run_extract(args: &ExtractArgs) -> Result<RunResult> {
    let span = info_span!("extract", workbook = %args.workbook.display());
    let _guard = span.enter();
    let start = Instant::now();
    let ctx = build_context(&args.engine)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.workbook));

    let (_, report) = extract(&ctx, &args.workbook)?;
    let report_files = write_reports(&ctx, &output_dir, &report)?;
    info!(
        sheets = report.sheets.len(),
        duration_ms = start.elapsed().as_millis(),
        "Extraction complete"
    );
    Ok(RunResult {
        oracle: ctx.oracle_name().to_string(),
        report,
        output_dir,
        report_files,
        filled_workbook: None,
        filled_cells: 0,
    })
}

pub fn run_fill(args: &FillArgs) -> Result<RunResult> {
    let span = info_span!("fill", workbook = %args.workbook.display());
    let _guard = span.enter();
    let start = Instant::now();
    let ctx = build_context(&args.engine)?;
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None if args.report.is_dir() => args.report.clone(),
        None => args
            .report
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
    };

    let mut report = load_report(&args.report)
        .with_context(|| format!("load report {}", args.report.display()))?;
    let file_name = args
        .workbook
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if file_name != report.source {
        warn!(
            report_source = %report.source,
            workbook = %file_name,
            "Report was extracted from a different file name"
        );
    }
    let sheets = read_workbook(&args.workbook)
        .with_context(|| format!("read workbook {}", args.workbook.display()))?;

    let (path, cells) = write_filled(&ctx, &output_dir, &args.workbook, &sheets, &mut report)?;
    info!(
        cells,
        duration_ms = start.elapsed().as_millis(),
        "Fill complete"
    );
    Ok(RunResult {
        oracle: ctx.oracle_name().to_string(),
        report,
        output_dir,
        report_files: Vec::new(),
        filled_workbook: Some(path),
        filled_cells: cells,
    })
}

/// Extract, write the reports, then fill.
pub fn run_all(args: &ExtractArgs) -> Result<RunResult> {
    let span = info_span!("run", workbook = %args.workbook.display());
    let _guard = span.enter();
    let start = Instant::now();
    let ctx = build_context(&args.engine)?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(&args.workbook));

    let (sheets, mut report) = extract(&ctx, &args.workbook)?;
    let (path, cells) = write_filled(&ctx, &output_dir, &args.workbook, &sheets, &mut report)?;
    let report_files = write_reports(&ctx, &output_dir, &report)?;
    info!(
        cells,
        duration_ms = start.elapsed().as_millis(),
        "Run complete"
    );
    Ok(RunResult {
        oracle: ctx.oracle_name().to_string(),
        report,
        output_dir,
        report_files,
        filled_workbook: Some(path),
        filled_cells: cells,
    })
}

pub fn run_inspect(args: &InspectArgs) -> Result<DocumentReport> {
    let span = info_span!("inspect", workbook = %args.workbook.display());
    let _guard = span.enter();
    let ctx = build_context(&args.engine)?;
    let (_, report) = extract(&ctx, &args.workbook)?;
    for sheet in report.question_sheets() {
        let Some(forest) = &sheet.forest else {
            continue;
        };
        for node in forest.fillable().into_iter().take(3) {
            trace!(
                sheet = %sheet.sheet,
                level = node.level,
                text = redact_value(&node.text),
                "Sample question"
            );
        }
    }
    Ok(report)
}
