//! Filled workbook output.
//!
//! An `.xlsx`/`.xlsm` source is loaded with umya-spreadsheet, the synthesized
//! [`ValueGrid`] cells are set in place and the workbook is saved under the
//! new name, so existing formatting survives. Other sources (CSV, `.xls`,
//! `.ods`) are rebuilt cell by cell into a new workbook.

use std::collections::BTreeSet;
use std::path::Path;

use qfill_model::{CellValue, DocumentReport, SheetSnapshot, ValueGrid};
use tracing::{debug, info, warn};
use umya_spreadsheet::{Spreadsheet, Worksheet, XlsxError};

use crate::error::{ReportError, Result};

/// Excel's worksheet name limit.
pub const MAX_SHEET_NAME: usize = 31;

const INVALID_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Extensions umya-spreadsheet can load and save back.
const EDITABLE_EXTENSIONS: &[&str] = &["xlsx", "xlsm"];

/// File name for the filled copy of `source`.
pub fn filled_workbook_name(source: &str) -> String {
    let stem = Path::new(source)
        .file_stem()
        .map_or_else(|| source.to_string(), |s| s.to_string_lossy().into_owned());
    format!("filled_{stem}.xlsx")
}

/// A worksheet name Excel accepts, unique among `taken`.
pub fn worksheet_name(name: &str, taken: &mut BTreeSet<String>) -> String {
    let mut base: String = name
        .trim_matches('\'')
        .chars()
        .map(|c| if INVALID_NAME_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    if base.trim().is_empty() {
        base = "Sheet".to_string();
    }
    let mut candidate = base.clone();
    let mut n = 2;
    while taken.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

/// True when the source can be edited in place rather than rebuilt.
pub fn is_editable_source(source: &Path) -> bool {
    source
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| EDITABLE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// umya addresses cells as 1-based `(column, row)`.
fn coordinate(sheet: &str, row: usize, column: usize) -> Result<(u32, u32)> {
    match (u32::try_from(column + 1), u32::try_from(row + 1)) {
        (Ok(c), Ok(r)) => Ok((c, r)),
        _ => Err(ReportError::CellOutOfRange {
            sheet: sheet.to_string(),
            row,
            column,
        }),
    }
}

fn write_grid(worksheet: &mut Worksheet, sheet: &str, grid: &ValueGrid) -> Result<usize> {
    let mut written = 0;
    for (row, column, value) in grid.iter() {
        let at = coordinate(sheet, row, column)?;
        worksheet.get_cell_mut(at).set_value_string(value);
        written += 1;
    }
    Ok(written)
}

fn write_source_cells(worksheet: &mut Worksheet, sheet: &SheetSnapshot) -> Result<()> {
    for row in &sheet.rows {
        for (column, value) in &row.cells {
            let at = coordinate(&sheet.name, row.index, *column)?;
            let cell = worksheet.get_cell_mut(at);
            match value {
                CellValue::Empty => {}
                CellValue::Text(text) | CellValue::Error(text) => {
                    cell.set_value_string(text.as_str());
                }
                CellValue::Number(number) => {
                    cell.set_value_number(*number);
                }
                CellValue::Bool(flag) => {
                    cell.set_value_bool(*flag);
                }
            }
        }
    }
    Ok(())
}

/// Set the synthesized cells of every filled sheet in the loaded source.
fn fill_in_place(book: &mut Spreadsheet, report: &DocumentReport) -> Result<usize> {
    let mut total = 0;
    for sheet in &report.sheets {
        let Some(grid) = sheet.grid.as_ref().filter(|grid| !grid.is_empty()) else {
            continue;
        };
        let worksheet = book.get_sheet_by_name_mut(&sheet.sheet).ok_or_else(|| {
            ReportError::SheetNotFound {
                sheet: sheet.sheet.clone(),
            }
        })?;
        let written = write_grid(worksheet, &sheet.sheet, grid)?;
        debug!(sheet = %sheet.sheet, written, "Filled worksheet in place");
        total += written;
    }
    Ok(total)
}

/// Build a new workbook from the snapshots, then set the synthesized cells.
fn rebuild(sheets: &[SheetSnapshot], report: &DocumentReport) -> Result<(Spreadsheet, usize)> {
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let mut taken = BTreeSet::new();
    let mut total = 0;
    for sheet in sheets {
        let name = worksheet_name(&sheet.name, &mut taken);
        let worksheet = book
            .new_sheet(name.as_str())
            .map_err(|detail| ReportError::SheetCreate {
                sheet: name.clone(),
                detail: detail.to_string(),
            })?;
        write_source_cells(worksheet, sheet)?;
        let written = match report.sheet(&sheet.name).and_then(|s| s.grid.as_ref()) {
            Some(grid) => write_grid(worksheet, &sheet.name, grid)?,
            None => 0,
        };
        debug!(sheet = %sheet.name, written, "Rebuilt worksheet");
        total += written;
    }
    Ok((book, total))
}

/// Write the filled copy of `source` to `path`.
///
/// `.xlsx`/`.xlsm` sources are edited in place so existing formatting is
/// kept; `sheets` are only used to rebuild other formats. Returns the number
/// of synthesized cells written.
pub fn write_filled_workbook(
    source: &Path,
    path: &Path,
    sheets: &[SheetSnapshot],
    report: &DocumentReport,
) -> Result<usize> {
    let xlsx = |path: &Path| {
        let path = path.to_path_buf();
        move |source: XlsxError| ReportError::Xlsx { path, source }
    };

    let (book, total) = if is_editable_source(source) {
        let mut book = umya_spreadsheet::reader::xlsx::read(source).map_err(xlsx(source))?;
        let total = fill_in_place(&mut book, report)?;
        (book, total)
    } else {
        warn!(
            source = %source.display(),
            "Source format cannot be edited in place; writing a rebuilt workbook"
        );
        rebuild(sheets, report)?
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }
    umya_spreadsheet::writer::xlsx::write(&book, path).map_err(xlsx(path))?;
    info!(path = %path.display(), cells = total, "Saved filled workbook");
    Ok(total)
}
