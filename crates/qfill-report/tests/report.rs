//! Persistence and workbook output tests.

use std::collections::BTreeMap;
use std::path::Path;

use qfill_ingest::read_workbook;
use qfill_model::{
    Classified, DocumentReport, GlobalContext, SheetClassification, SheetReport, SheetRole,
    SheetSnapshot, Source, ValueGrid,
};
use qfill_report::{
    ANALYSIS_FILE, AnalysisReport, EXTRACTION_FILE, ReportError, filled_workbook_name,
    load_report, write_filled_workbook, write_report_outputs,
};
use rust_xlsxwriter::{Format, Workbook};

fn source_sheet() -> SheetSnapshot {
    SheetSnapshot::from_text_grid(
        "Reqs",
        &[
            vec!["Requirement", "Status", "Comments"],
            vec!["Must log access", "", ""],
            vec!["Must encrypt data", "", "Prefilled"],
        ],
    )
}

fn report() -> DocumentReport {
    let mut sheet = SheetReport::new(SheetClassification {
        sheet: "Reqs".to_string(),
        classified: Classified::new(SheetRole::Question, 0.85, Source::Statistical),
        trail: vec![],
    });
    let mut grid = ValueGrid::new("Reqs");
    grid.commit_row(
        1,
        &BTreeMap::from([(1, "Yes".to_string()), (2, "Standard feature".to_string())]),
    );
    grid.commit_row(2, &BTreeMap::from([(1, "Partial".to_string())]));
    sheet.grid = Some(grid);
    sheet.preserved_rows = vec![3];
    DocumentReport {
        source: "rfi.xlsx".to_string(),
        global_context: GlobalContext::generic(),
        content_sheet: None,
        sheets: vec![sheet],
        audit: vec![],
    }
}

#[test]
fn report_survives_a_save_and_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let original = report();
    let analysis = AnalysisReport::new(&original, "offline", false);
    let written = write_report_outputs(dir.path(), &original, &analysis).expect("write reports");
    assert_eq!(written.len(), 2);
    assert!(dir.path().join(EXTRACTION_FILE).is_file());

    let from_dir = load_report(dir.path()).expect("load from directory");
    let from_file = load_report(&dir.path().join(EXTRACTION_FILE)).expect("load from file");
    assert_eq!(from_dir, original);
    assert_eq!(from_file, original);
}

#[test]
fn analysis_report_is_flat() {
    let dir = tempfile::tempdir().expect("temp dir");
    let original = report();
    let analysis = AnalysisReport::new(&original, "offline", true);
    write_report_outputs(dir.path(), &original, &analysis).expect("write reports");

    let text = std::fs::read_to_string(dir.path().join(ANALYSIS_FILE)).expect("read analysis");
    let json: serde_json::Value = serde_json::from_str(&text).expect("analysis is JSON");
    assert_eq!(json["source"], "rfi.xlsx");
    assert_eq!(json["oracle"], "offline");
    assert_eq!(json["question_sheets"], 1);
    assert_eq!(json["sheets"][0]["preserved"], 1);
    assert!(json["generated_at"].is_string());
}

#[test]
fn missing_report_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = load_report(dir.path()).expect_err("no report yet");
    assert!(matches!(error, ReportError::NotFound { .. }));
}

/// Writes the `Reqs` source sheet with a bold header row and a wide first column.
fn styled_source(path: &Path) {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Reqs").expect("sheet name");
    worksheet.set_column_width(0, 60).expect("column width");
    for (column, header) in ["Requirement", "Status", "Comments"].iter().enumerate() {
        let column = u16::try_from(column).expect("column");
        worksheet
            .write_string_with_format(0, column, *header, &bold)
            .expect("header");
    }
    worksheet.write_string(1, 0, "Must log access").expect("row 1");
    worksheet.write_string(2, 0, "Must encrypt data").expect("row 2");
    worksheet.write_string(2, 2, "Prefilled").expect("row 2 comment");
    let notes = workbook.add_worksheet();
    notes.set_name("Notes").expect("sheet name");
    notes.write_string(0, 0, "Internal only").expect("note");
    workbook.save(path).expect("save source");
}

fn row_text(sheet: &SheetSnapshot, index: usize, column: usize) -> String {
    sheet
        .rows
        .iter()
        .find(|r| r.index == index)
        .map(|row| row.text(column))
        .unwrap_or_default()
}

#[test]
fn filled_workbook_keeps_source_formatting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("rfi.xlsx");
    styled_source(&source);
    let path = dir.path().join("out").join(filled_workbook_name("rfi.xlsx"));
    let written = write_filled_workbook(&source, &path, &[], &report()).expect("write workbook");
    assert_eq!(written, 3);

    let sheets = read_workbook(&path).expect("read back");
    let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Reqs", "Notes"]);
    let reqs = &sheets[0];
    assert_eq!(row_text(reqs, 0, 1), "Status");
    assert_eq!(row_text(reqs, 1, 0), "Must log access");
    assert_eq!(row_text(reqs, 1, 1), "Yes");
    assert_eq!(row_text(reqs, 1, 2), "Standard feature");
    assert_eq!(row_text(reqs, 2, 1), "Partial");
    assert_eq!(row_text(reqs, 2, 2), "Prefilled");
    assert_eq!(row_text(&sheets[1], 0, 0), "Internal only");

    let book = umya_spreadsheet::reader::xlsx::read(&path).expect("reload with styles");
    let worksheet = book.get_sheet_by_name("Reqs").expect("Reqs sheet");
    let header = worksheet.get_cell((2u32, 1u32)).expect("header cell");
    let bold = header
        .get_style()
        .get_font()
        .is_some_and(|font| font.get_bold().to_owned());
    assert!(bold, "header lost its bold font");
}

#[test]
fn csv_source_is_rebuilt_from_snapshots() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(filled_workbook_name("controls.csv"));
    let written = write_filled_workbook(
        Path::new("controls.csv"),
        &path,
        &[source_sheet()],
        &report(),
    )
    .expect("write workbook");
    assert_eq!(written, 3);

    let sheets = read_workbook(&path).expect("read back");
    assert_eq!(sheets.len(), 1);
    assert_eq!(row_text(&sheets[0], 1, 0), "Must log access");
    assert_eq!(row_text(&sheets[0], 1, 1), "Yes");
    assert_eq!(row_text(&sheets[0], 2, 2), "Prefilled");
}

#[test]
fn filled_sheet_missing_from_source_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = dir.path().join("rfi.xlsx");
    let mut workbook = Workbook::new();
    workbook.add_worksheet().set_name("Other").expect("sheet name");
    workbook.save(&source).expect("save source");

    let path = dir.path().join("filled_rfi.xlsx");
    let error = write_filled_workbook(&source, &path, &[], &report()).expect_err("no Reqs sheet");
    assert!(matches!(error, ReportError::SheetNotFound { .. }));
}
