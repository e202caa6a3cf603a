//! Workbook loading into [`SheetSnapshot`]s.

use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use qfill_model::{CellValue, RowSample, SheetSnapshot};
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Maximum workbook size accepted (200 MB).
pub const MAX_WORKBOOK_SIZE: u64 = 200 * 1024 * 1024;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Load every sheet of a workbook. CSV files load as a single sheet named
/// after the file stem. Sheets without any content are dropped.
pub fn read_workbook(path: &Path) -> Result<Vec<SheetSnapshot>> {
    check_file(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let sheets = if extension == "csv" {
        vec![read_csv_sheet(path)?]
    } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
        read_spreadsheet(path)?
    } else {
        return Err(IngestError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension,
        });
    };

    let sheets: Vec<SheetSnapshot> = sheets
        .into_iter()
        .filter(|sheet| {
            let keep = !sheet.rows.is_empty();
            if !keep {
                debug!(sheet = %sheet.name, "Skipping empty sheet");
            }
            keep
        })
        .collect();
    if sheets.is_empty() {
        return Err(IngestError::EmptyWorkbook {
            path: path.to_path_buf(),
        });
    }
    Ok(sheets)
}

fn check_file(path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if metadata.len() > MAX_WORKBOOK_SIZE {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size: MAX_WORKBOOK_SIZE,
        });
    }
    Ok(())
}

fn read_spreadsheet(path: &Path) -> Result<Vec<SheetSnapshot>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::Workbook {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&name) {
            Ok(range) => range,
            Err(e) => {
                // Chart sheets and other non-grid sheets fail here.
                warn!(sheet = %name, error = %e, "Skipping unreadable sheet");
                continue;
            }
        };
        let (row_offset, col_offset) = range
            .start()
            .map_or((0, 0), |(r, c)| (r as usize, c as usize));
        let rows = range
            .rows()
            .enumerate()
            .map(|(r, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .fold(RowSample::new(row_offset + r), |row, (c, data)| {
                        row.with_cell(col_offset + c, cell_value(data))
                    })
            })
            .collect();
        let sheet = SheetSnapshot::from_rows(name, rows);
        debug!(
            sheet = %sheet.name,
            rows = sheet.rows.len(),
            columns = sheet.column_count,
            "Loaded sheet"
        );
        sheets.push(sheet);
    }
    Ok(sheets)
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(text) => CellValue::Text(text.clone()),
        Data::Float(value) => CellValue::Number(*value),
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::Error(error) => CellValue::Error(format!("{error:?}")),
        other => CellValue::Text(other.to_string()),
    }
}

/// Read a CSV file as a single sheet. Every record is kept as-is; the
/// header is detected like any other sheet.
pub fn read_csv_sheet(path: &Path) -> Result<SheetSnapshot> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for (r, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let row = record
            .iter()
            .enumerate()
            .fold(RowSample::new(r), |row, (c, field)| {
                row.with_cell(c, CellValue::Text(field.to_string()))
            });
        rows.push(row);
    }
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Sheet1")
        .to_string();
    Ok(SheetSnapshot::from_rows(name, rows))
}
