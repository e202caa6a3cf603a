use std::fs;

use qfill_ingest::{IngestError, read_workbook, sheet_column_stats};
use qfill_model::{CellValue, TypeHint};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

#[test]
fn reads_every_sheet_of_an_xlsx_workbook() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("rfi.xlsx");

    let mut workbook = Workbook::new();
    let intro = workbook.add_worksheet();
    intro.set_name("Instructions").expect("name");
    intro
        .write_string(0, 0, "Please fill in all response columns")
        .expect("write");
    let reqs = workbook.add_worksheet();
    reqs.set_name("Requirements").expect("name");
    reqs.write_string(0, 0, "Requirement").expect("write");
    reqs.write_string(0, 1, "Status").expect("write");
    reqs.write_string(1, 0, "Must support SSL").expect("write");
    reqs.write_number(2, 0, 42.0).expect("write");
    workbook.save(&path).expect("save workbook");

    let sheets = read_workbook(&path).expect("read workbook");
    assert_eq!(sheets.len(), 2);
    assert_eq!(sheets[0].name, "Instructions");
    let reqs = &sheets[1];
    assert_eq!(reqs.header_text(1), "Status");
    assert_eq!(reqs.data_row_count(), 2);
    assert_eq!(
        reqs.column_values(0),
        vec![
            CellValue::Text("Must support SSL".to_string()),
            CellValue::Number(42.0)
        ]
    );
}

#[test]
fn csv_loads_as_single_sheet_named_after_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("security.csv");
    fs::write(
        &path,
        "ID,Question,Response\n1,Do you encrypt data at rest?,\n2,Do you run penetration tests?,\n",
    )
    .expect("write csv");

    let sheets = read_workbook(&path).expect("read csv");
    assert_eq!(sheets.len(), 1);
    let sheet = &sheets[0];
    assert_eq!(sheet.name, "security");
    let stats = sheet_column_stats(sheet);
    assert_eq!(stats.len(), 3);
    assert_eq!(stats[0].type_hint, TypeHint::Numeric);
    assert_eq!(stats[2].fill_ratio, 0.0);
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("notes.txt");
    fs::write(&path, "hello").expect("write");
    let err = read_workbook(&path).unwrap_err();
    assert!(matches!(err, IngestError::UnsupportedFormat { .. }), "{err}");
}

#[test]
fn missing_file_is_reported() {
    let err = read_workbook(std::path::Path::new("/nonexistent/rfi.xlsx")).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { .. }), "{err}");
}
