//! End-to-end tests for the document pipeline.

use std::fs;

use chrono::NaiveDate;
use qfill_core::{
    OracleSettings, PipelineContext, ProcessingOptions, extract_document, extract_file,
    fill_document, process_document,
};
use qfill_model::{Condition, Distribution, GlobalContext, SheetRole, SheetSnapshot, Source};
use qfill_oracle::{OracleReply, ScriptedOracle};

const REQUIREMENT: &str = "The platform must encrypt all customer data at rest using AES-256 \
                           and manage keys in a hardware security module with audited rotation";

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date")
}

fn intro() -> SheetSnapshot {
    SheetSnapshot::from_text_grid(
        "Intro",
        &[
            vec!["Request for Information - Hosting"],
            vec!["Purpose: assess vendor hosting capabilities"],
            vec!["Please respond using Compliant, Partially Compliant or Not Compliant."],
        ],
    )
}

fn requirements(name: &str, rows: usize) -> SheetSnapshot {
    let mut grid = vec![vec![
        "Requirement".to_string(),
        "Compliance".to_string(),
        "Comments".to_string(),
    ]];
    for i in 0..rows {
        grid.push(vec![format!("{REQUIREMENT} ({i})."), String::new(), String::new()]);
    }
    SheetSnapshot::from_text_grid(name, &grid)
}

fn offline(options: ProcessingOptions) -> PipelineContext {
    PipelineContext::new(options).with_reference_date(reference_date())
}

#[test]
fn offline_run_fills_every_question_row() {
    let ctx = offline(ProcessingOptions::default().with_content_sheet(Some("Intro".to_string())));
    let sheets = vec![intro(), requirements("Security", 12)];
    let report = process_document(&ctx, "rfi.xlsx", &sheets);

    assert_eq!(report.content_sheet.as_deref(), Some("Intro"));
    assert_eq!(report.global_context.document_type, "RFI Document");
    let intro = report.sheet("Intro").expect("intro report");
    assert_eq!(intro.role(), SheetRole::Content);
    assert_eq!(intro.classification.classified.source, Source::Override);

    let security = report.sheet("Security").expect("security report");
    assert_eq!(security.role(), SheetRole::Question);
    let layout = security.layout.as_ref().expect("layout");
    assert_eq!(layout.question_column, 0);
    assert_eq!(layout.answer_columns, vec![1, 2]);
    assert_eq!(security.assignments.len(), 12);

    let grid = security.grid.as_ref().expect("grid");
    for row in 1..=12 {
        let status = grid.get(row, 1).unwrap_or_default();
        assert!(!status.is_empty(), "row {row} has no status");
    }
    assert!(report.all_audit_events().any(|event| matches!(
        event.condition,
        Condition::OracleUnavailable { .. }
    )));

    let summary = report.summary();
    assert_eq!(summary.question_sheets, 1);
    assert_eq!(summary.fillable_items, 12);
    assert_eq!(summary.sheets[0].filled, 12);
}

#[test]
fn survey_content_sheet_uses_the_answered_split() {
    let about = SheetSnapshot::from_text_grid(
        "About",
        &[
            vec!["Customer Satisfaction Survey"],
            vec!["Please fill in every question before the end of the month."],
        ],
    );
    let ctx = offline(ProcessingOptions::default().with_content_sheet(Some("About".to_string())));
    let report = process_document(&ctx, "survey.xlsx", &[about, requirements("Feedback", 10)]);

    assert_eq!(report.global_context.document_type, "Survey");
    assert!(!report.global_context.is_compliance());
    let feedback = report.sheet("Feedback").expect("feedback report");
    let strategy = feedback.strategy.as_ref().expect("strategy");
    assert_eq!(strategy.distribution, Distribution::binary_default());
}

#[test]
fn partially_answered_rows_keep_their_cells() {
    let mut grid = vec![vec![
        "Requirement".to_string(),
        "Compliance".to_string(),
        "Comments".to_string(),
    ]];
    for i in 0..6 {
        let comment = if i == 0 { "Via SAML" } else { "" };
        grid.push(vec![format!("{REQUIREMENT} ({i})."), String::new(), comment.to_string()]);
    }
    let sheet = SheetSnapshot::from_text_grid("Security", &grid);
    let ctx = offline(ProcessingOptions::default().with_force_non_empty(true));
    let report = process_document(&ctx, "rfi.xlsx", &[intro(), sheet]);

    let security = report.sheet("Security").expect("security report");
    let grid = security.grid.as_ref().expect("grid");
    assert!(grid.get(1, 1).is_some_and(|status| !status.is_empty()));
    assert_eq!(grid.get(1, 2), None);
    assert_eq!(security.preserved_cells, vec![(1, 2)]);
    assert!(security.audit.iter().any(|event| matches!(
        event.condition,
        Condition::ExistingAnswers { cells: 1 }
    )));
}

#[test]
fn parallelism_does_not_change_the_fill() {
    let sheets = vec![
        intro(),
        requirements("Security", 20),
        requirements("Hosting", 15),
        requirements("Support", 9),
    ];
    let serial = offline(ProcessingOptions::default().with_max_parallel_sheets(1));
    let parallel = offline(ProcessingOptions::default().with_max_parallel_sheets(4));

    let extracted = extract_document(&serial, "rfi.xlsx", &sheets);
    assert!(extracted.sheets.iter().all(|s| s.grid.is_none()));

    let mut a = extracted.clone();
    fill_document(&serial, &mut a);
    let mut b = extracted;
    fill_document(&parallel, &mut b);
    assert_eq!(a, b);
    assert_eq!(a.question_sheets().count(), 3);
}

#[test]
fn salt_changes_the_fill_but_not_the_structure() {
    let sheets = vec![intro(), requirements("Security", 30)];
    let plain = offline(ProcessingOptions::default());
    let salted = offline(ProcessingOptions::default().with_seed_salt(42));

    let a = process_document(&plain, "rfi.xlsx", &sheets);
    let b = process_document(&salted, "rfi.xlsx", &sheets);
    let (a, b) = (a.sheet("Security").expect("a"), b.sheet("Security").expect("b"));
    assert_eq!(a.forest, b.forest);
    assert_eq!(a.strategy, b.strategy);
    assert_ne!(a.grid, b.grid);
}

#[test]
fn oracle_context_reaches_the_report() {
    let oracle = ScriptedOracle::new().on_context(|_| {
        Ok(OracleReply::Answer(GlobalContext {
            document_type: "Vendor Security Review".to_string(),
            ..GlobalContext::generic()
        }))
    });
    let options = ProcessingOptions::default()
        .with_content_sheet(Some("Intro".to_string()))
        .with_oracle(OracleSettings::immediate());
    let ctx = offline(options).with_oracle(oracle);

    let report = extract_document(&ctx, "rfi.xlsx", &[intro(), requirements("Security", 6)]);
    assert_eq!(report.global_context.document_type, "Vendor Security Review");
    assert_eq!(report.global_context.source_sheet.as_deref(), Some("Intro"));
}

#[test]
fn csv_questionnaire_is_extracted_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("controls.csv");
    let mut body = String::from("Requirement,Status,Comments\n");
    for i in 0..8 {
        body.push_str(&format!("\"{REQUIREMENT} ({i}).\",,\n"));
    }
    fs::write(&path, body).expect("write csv");

    let ctx = offline(ProcessingOptions::default());
    let (sheets, mut report) = extract_file(&ctx, &path).expect("extract csv");
    assert_eq!(sheets.len(), 1);
    assert_eq!(report.source, "controls.csv");
    fill_document(&ctx, &mut report);

    let sheet = report.question_sheets().next().expect("question sheet");
    assert_eq!(sheet.assignments.len(), 8);
}

#[test]
fn missing_workbook_is_an_error() {
    let ctx = offline(ProcessingOptions::default());
    let error = extract_file(&ctx, std::path::Path::new("/nonexistent/rfi.xlsx"))
        .expect_err("missing file");
    assert!(error.to_string().contains("read workbook"));
}
