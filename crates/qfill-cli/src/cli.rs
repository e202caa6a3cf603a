//! CLI argument definitions for `qfill`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use qfill_cli::distribution::parse_distribution;
use qfill_model::Distribution;

#[derive(Parser)]
#[command(
    name = "qfill",
    version,
    about = "Infer the structure of spreadsheet questionnaires and fill them",
    long_about = "Infer the structure of spreadsheet questionnaires (RFI, RFP and \
                  compliance workbooks) and fill them with synthetic responses.\n\n\
                  `extract` writes a JSON report, `fill` turns a report into a \
                  filled workbook, and `run` does both."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow questionnaire text in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Infer structure and fill strategies, writing the JSON report.
    Extract(ExtractArgs),

    /// Fill a workbook from a previously written report.
    Fill(FillArgs),

    /// Extract and fill in one pass.
    Run(ExtractArgs),

    /// Print sheet and column classifications without writing anything.
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Questionnaire workbook (.xlsx, .xlsm, .xls, .ods or .csv).
    #[arg(value_name = "WORKBOOK")]
    pub workbook: PathBuf,

    /// Output directory (default: <WORKBOOK stem>_qfill next to the workbook).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args)]
pub struct FillArgs {
    /// The workbook the report was extracted from.
    #[arg(value_name = "WORKBOOK")]
    pub workbook: PathBuf,

    /// Report directory or `extraction_results.json` file.
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// Output directory (default: the report directory).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Questionnaire workbook to inspect.
    #[arg(value_name = "WORKBOOK")]
    pub workbook: PathBuf,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Options shared by every command that runs the engine.
#[derive(Args, Clone)]
pub struct EngineArgs {
    /// Treat this sheet as the content sheet instead of detecting one.
    #[arg(long = "content-sheet", value_name = "SHEET")]
    pub content_sheet: Option<String>,

    /// Use marker rules only when assigning hierarchy levels.
    #[arg(long = "no-hierarchy-oracle")]
    pub no_hierarchy_oracle: bool,

    /// Fill optional columns (comments, references) on every row.
    #[arg(long = "force-non-empty")]
    pub force_non_empty: bool,

    /// Response mix, e.g. `positive=70,negative=15,partial=15`.
    #[arg(long = "distribution", value_name = "TYPE=WEIGHT,...", value_parser = parse_distribution)]
    pub distribution: Option<Distribution>,

    /// Salt mixed into every row seed; change it to get a different fill.
    #[arg(long = "seed", value_name = "N", default_value_t = 0)]
    pub seed: u64,

    /// Question sheets processed in parallel.
    #[arg(long = "jobs", short = 'j', value_name = "N", default_value_t = 4)]
    pub jobs: usize,

    /// Never contact the oracle, even when an endpoint is configured.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Oracle endpoint; the run is offline when unset.
    #[arg(long = "oracle-url", env = "QFILL_ORACLE_URL", value_name = "URL")]
    pub oracle_url: Option<String>,

    /// Bearer token sent to the oracle.
    #[arg(
        long = "oracle-token",
        env = "QFILL_ORACLE_TOKEN",
        value_name = "TOKEN",
        hide_env_values = true
    )]
    pub oracle_token: Option<String>,

    /// Per-call oracle timeout.
    #[arg(long = "oracle-timeout-secs", value_name = "SECS", default_value_t = 30)]
    pub oracle_timeout_secs: u64,

    /// Retries after a failed oracle call.
    #[arg(long = "oracle-retries", value_name = "N", default_value_t = 2)]
    pub oracle_retries: u32,

    /// Oracle calls allowed in flight at once.
    #[arg(long = "oracle-concurrency", value_name = "N", default_value_t = 4)]
    pub oracle_concurrency: usize,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
