//! Immutable snapshots of spreadsheet contents.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single cell value as captured from the workbook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Spreadsheet error literal such as `#REF!`.
    Error(String),
}

impl CellValue {
    /// Trimmed display text; empty for `Empty` cells.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.trim().to_string(),
            Self::Number(value) => format_number(*value),
            Self::Bool(value) => value.to_string(),
            Self::Error(code) => code.clone(),
        }
    }

    /// The raw text without trimming, used by the hierarchy parser which
    /// relies on leading whitespace.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// One physical row of a sheet. Only non-empty cells are stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSample {
    pub index: usize,
    pub cells: BTreeMap<usize, CellValue>,
}

impl RowSample {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            cells: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_cell(mut self, column: usize, value: CellValue) -> Self {
        if !value.is_empty() {
            self.cells.insert(column, value);
        }
        self
    }

    pub fn cell(&self, column: usize) -> Option<&CellValue> {
        self.cells.get(&column)
    }

    pub fn text(&self, column: usize) -> String {
        self.cell(column).map(CellValue::as_text).unwrap_or_default()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_empty)
    }
}

/// Immutable capture of one sheet.
///
/// `rows` are ordered by physical index. The header row is the first
/// non-empty row; everything after it is data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetSnapshot {
    pub name: String,
    pub rows: Vec<RowSample>,
    pub row_count: usize,
    pub column_count: usize,
    pub header_row: Option<usize>,
}

impl SheetSnapshot {
    /// Build a snapshot from rows, dropping blank rows and deriving counts.
    pub fn from_rows(name: impl Into<String>, rows: Vec<RowSample>) -> Self {
        let mut rows: Vec<RowSample> = rows.into_iter().filter(|row| !row.is_blank()).collect();
        rows.sort_by_key(|row| row.index);
        let row_count = rows.last().map_or(0, |row| row.index + 1);
        let column_count = rows
            .iter()
            .filter_map(|row| row.cells.keys().next_back())
            .max()
            .map_or(0, |col| col + 1);
        let header_row = rows.first().map(|row| row.index);
        Self {
            name: name.into(),
            rows,
            row_count,
            column_count,
            header_row,
        }
    }

    /// Convenience constructor from a text grid, used by readers and tests.
    /// Row 0 of the grid becomes physical row 0.
    pub fn from_text_grid<S: AsRef<str>>(name: impl Into<String>, grid: &[Vec<S>]) -> Self {
        let rows = grid
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                cells.iter().enumerate().fold(RowSample::new(r), |row, (c, value)| {
                    row.with_cell(c, CellValue::Text(value.as_ref().to_string()))
                })
            })
            .collect();
        Self::from_rows(name, rows)
    }

    pub fn header(&self) -> Option<&RowSample> {
        let header = self.header_row?;
        self.rows.iter().find(|row| row.index == header)
    }

    pub fn header_text(&self, column: usize) -> String {
        self.header().map(|row| row.text(column)).unwrap_or_default()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> impl Iterator<Item = &RowSample> {
        let header = self.header_row;
        self.rows
            .iter()
            .filter(move |row| header.is_none_or(|h| row.index > h))
    }

    pub fn data_row_count(&self) -> usize {
        self.data_rows().count()
    }

    /// Data values of a column in row order, including empty cells.
    pub fn column_values(&self, column: usize) -> Vec<CellValue> {
        self.data_rows()
            .map(|row| row.cell(column).cloned().unwrap_or_default())
            .collect()
    }

    /// Columns holding at least one non-empty cell (header included).
    pub fn populated_columns(&self) -> Vec<usize> {
        let mut columns: Vec<usize> = self
            .rows
            .iter()
            .flat_map(|row| row.cells.keys().copied())
            .collect();
        columns.sort_unstable();
        columns.dedup();
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rows_are_dropped_and_header_detected() {
        let rows = vec![
            RowSample::new(0),
            RowSample::new(1).with_cell(0, CellValue::Text("Requirement".into())),
            RowSample::new(2).with_cell(0, CellValue::Text("Must log".into())),
        ];
        let sheet = SheetSnapshot::from_rows("Reqs", rows);
        assert_eq!(sheet.header_row, Some(1));
        assert_eq!(sheet.data_row_count(), 1);
        assert_eq!(sheet.row_count, 3);
        assert_eq!(sheet.column_count, 1);
    }

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(CellValue::Number(12.0).as_text(), "12");
        assert_eq!(CellValue::Number(1.5).as_text(), "1.5");
    }
}
