//! Terminal tables for run results and inspections.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use qfill_classify::{ConfidenceLevel, ConfidenceThresholds};
use qfill_model::{AuditEvent, AuditScope, DocumentReport, SheetRole, Source};

use crate::types::RunResult;

/// Plain text lines printed above the tables.
pub fn overview_lines(result: &RunResult) -> Vec<String> {
    let report = &result.report;
    let summary = report.summary();
    let context = &report.global_context;
    let mut lines = vec![
        format!("Source: {}", report.source),
        format!("Oracle: {}", result.oracle),
        match &context.source_sheet {
            Some(sheet) => format!("Context: {} (from {sheet})", context.document_type),
            None => format!("Context: {}", context.document_type),
        },
        format!(
            "Sheets: {} total, {} question",
            summary.total_sheets, summary.question_sheets
        ),
        format!(
            "Items: {} total, {} fillable ({:.1}%), {} structural",
            summary.total_items,
            summary.fillable_items,
            summary.fillable_percentage,
            summary.structural_items
        ),
        format!("Audit events: {}", summary.audit_events),
        format!("Output: {}", result.output_dir.display()),
    ];
    for path in &result.report_files {
        lines.push(format!("Report: {}", path.display()));
    }
    if let Some(path) = &result.filled_workbook {
        lines.push(format!(
            "Filled workbook: {} ({} cells)",
            path.display(),
            result.filled_cells
        ));
    }
    lines
}

pub fn print_summary(result: &RunResult) {
    for line in overview_lines(result) {
        println!("{line}");
    }
    println!("{}", sheet_table(&result.report));
    if let Some(table) = audit_table(&result.report) {
        println!();
        println!("Audit:");
        println!("{table}");
    }
}

/// Sheet and column tables for `inspect`.
pub fn print_inspection(report: &DocumentReport) {
    println!("Source: {}", report.source);
    println!("Context: {}", report.global_context.document_type);
    println!("{}", sheet_table(report));
    println!();
    println!("Columns:");
    println!("{}", column_table(report, ConfidenceThresholds::default()));
    if let Some(table) = audit_table(report) {
        println!();
        println!("Audit:");
        println!("{table}");
    }
}

/// One row per sheet plus a total over question sheets.
pub fn sheet_table(report: &DocumentReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Role"),
        header_cell("Source"),
        header_cell("Confidence"),
        header_cell("Items"),
        header_cell("Fillable"),
        header_cell("Filled"),
        header_cell("Preserved"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 3..8 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let summary = report.summary();
    for sheet in &report.sheets {
        let classified = &sheet.classification.classified;
        let counts = summary.sheets.iter().find(|s| s.sheet == sheet.sheet);
        let mut row = vec![
            sheet_cell(&sheet.sheet, classified.role),
            role_cell(classified.role),
            source_cell(classified.source),
            Cell::new(format!("{:.2}", classified.confidence)),
        ];
        match counts {
            Some(counts) => row.extend([
                Cell::new(counts.total_items),
                Cell::new(counts.fillable),
                count_cell(counts.filled, Color::Green),
                count_cell(counts.preserved, Color::Yellow),
            ]),
            None => row.extend((0..4).map(|_| dim_cell("-"))),
        }
        table.add_row(row);
    }
    let filled: usize = summary.sheets.iter().map(|s| s.filled).sum();
    let preserved: usize = summary.sheets.iter().map(|s| s.preserved).sum();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{} question", summary.question_sheets))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(summary.total_items).add_attribute(Attribute::Bold),
        Cell::new(summary.fillable_items).add_attribute(Attribute::Bold),
        count_cell(filled, Color::Green).add_attribute(Attribute::Bold),
        count_cell(preserved, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Every classified column of every question sheet.
pub fn column_table(report: &DocumentReport, thresholds: ConfidenceThresholds) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Column"),
        header_cell("Header"),
        header_cell("Role"),
        header_cell("Source"),
        header_cell("Confidence"),
        header_cell("Layout"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);

    for sheet in report.question_sheets() {
        for column in &sheet.columns {
            let layout = match &sheet.layout {
                Some(l) if l.question_column == column.index => Cell::new("question")
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                Some(l) if l.answer_columns.contains(&column.index) => {
                    Cell::new("answer").fg(Color::Green)
                }
                _ => dim_cell("-"),
            };
            let level = thresholds.categorize(column.classified.confidence);
            table.add_row(vec![
                Cell::new(&sheet.sheet),
                Cell::new(column.index),
                Cell::new(if column.header.is_empty() {
                    "-"
                } else {
                    column.header.as_str()
                }),
                Cell::new(column.classified.role.as_str()),
                source_cell(column.classified.source),
                confidence_cell(column.classified.confidence, level),
                layout,
            ]);
        }
    }
    table
}

/// Audit events, or `None` when the run raised none.
pub fn audit_table(report: &DocumentReport) -> Option<Table> {
    let events: Vec<&AuditEvent> = report.all_audit_events().collect();
    if events.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Sheet"),
        header_cell("Scope"),
        header_cell("Condition"),
        header_cell("Resolution"),
    ]);
    apply_issue_table_style(&mut table);
    for event in events {
        table.add_row(vec![
            Cell::new(&event.sheet),
            Cell::new(scope_label(&event.scope)),
            Cell::new(event.condition.kind()).fg(Color::Yellow),
            Cell::new(&event.resolution),
        ]);
    }
    Some(table)
}

pub fn scope_label(scope: &AuditScope) -> String {
    match scope {
        AuditScope::Sheet => "sheet".to_string(),
        AuditScope::Column { index } => format!("column {index}"),
        AuditScope::Row { index } => format!("row {index}"),
        AuditScope::Strategy => "strategy".to_string(),
        AuditScope::Document => "document".to_string(),
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 7 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(24)),
            ColumnConstraint::LowerBoundary(Width::Fixed(6)),
            ColumnConstraint::UpperBoundary(Width::Percentage(35)),
        ]);
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
    if table.column_count() >= 8 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ]);
    }
}

fn apply_issue_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(160);
    if table.column_count() >= 4 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(24)),
            ColumnConstraint::UpperBoundary(Width::Fixed(12)),
            ColumnConstraint::UpperBoundary(Width::Fixed(26)),
            ColumnConstraint::UpperBoundary(Width::Percentage(60)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn sheet_cell(name: &str, role: SheetRole) -> Cell {
    match role {
        SheetRole::Question => Cell::new(name)
            .fg(Color::Blue)
            .add_attribute(Attribute::Bold),
        SheetRole::Content => Cell::new(name),
        SheetRole::Reference => dim_cell(name),
    }
}

fn role_cell(role: SheetRole) -> Cell {
    match role {
        SheetRole::Question => Cell::new(role.as_str()).fg(Color::Blue),
        SheetRole::Content => Cell::new(role.as_str()).fg(Color::Magenta),
        SheetRole::Reference => dim_cell(role.as_str()),
    }
}

fn source_cell(source: Source) -> Cell {
    match source {
        Source::Statistical => Cell::new(source.as_str()).fg(Color::Yellow),
        _ => Cell::new(source.as_str()),
    }
}

fn confidence_cell(confidence: f32, level: ConfidenceLevel) -> Cell {
    let text = format!("{confidence:.2} {}", level.as_str());
    match level {
        ConfidenceLevel::High => Cell::new(text).fg(Color::Green),
        ConfidenceLevel::Medium => Cell::new(text).fg(Color::Yellow),
        ConfidenceLevel::Low => Cell::new(text)
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
