//! Per-sheet and per-document results of a processing run.

use serde::{Deserialize, Serialize};

use crate::context::GlobalContext;
use crate::error::AuditEvent;
use crate::question::{HierarchyStats, QuestionForest};
use crate::roles::{Classified, ColumnClassification, ColumnLayout, SheetRole, TierAttempt};
use crate::strategy::{FillStrategy, ResponseAssignment, ValueGrid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetClassification {
    pub sheet: String,
    pub classified: Classified<SheetRole>,
    pub trail: Vec<TierAttempt>,
}

/// Everything produced for one sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetReport {
    pub sheet: String,
    pub classification: SheetClassification,
    #[serde(default)]
    pub columns: Vec<ColumnClassification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<ColumnLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest: Option<QuestionForest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<FillStrategy>,
    #[serde(default)]
    pub assignments: Vec<ResponseAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<ValueGrid>,
    /// Rows holding answers that were kept as found.
    #[serde(default)]
    pub preserved_rows: Vec<usize>,
    /// `(row, column)` of every kept answer cell.
    #[serde(default)]
    pub preserved_cells: Vec<(usize, usize)>,
    #[serde(default)]
    pub audit: Vec<AuditEvent>,
}

impl SheetReport {
    pub fn new(classification: SheetClassification) -> Self {
        Self {
            sheet: classification.sheet.clone(),
            classification,
            columns: Vec::new(),
            layout: None,
            forest: None,
            strategy: None,
            assignments: Vec::new(),
            grid: None,
            preserved_rows: Vec::new(),
            preserved_cells: Vec::new(),
            audit: Vec::new(),
        }
    }

    pub fn role(&self) -> SheetRole {
        self.classification.classified.role
    }

    pub fn hierarchy_stats(&self) -> HierarchyStats {
        self.forest
            .as_ref()
            .map(QuestionForest::stats)
            .unwrap_or_default()
    }
}

/// Result of processing a whole workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source: String,
    pub global_context: GlobalContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_sheet: Option<String>,
    pub sheets: Vec<SheetReport>,
    /// Events not tied to a single sheet.
    #[serde(default)]
    pub audit: Vec<AuditEvent>,
}

impl DocumentReport {
    pub fn sheet(&self, name: &str) -> Option<&SheetReport> {
        self.sheets.iter().find(|s| s.sheet == name)
    }

    pub fn question_sheets(&self) -> impl Iterator<Item = &SheetReport> {
        self.sheets.iter().filter(|s| s.role() == SheetRole::Question)
    }

    pub fn all_audit_events(&self) -> impl Iterator<Item = &AuditEvent> {
        self.audit
            .iter()
            .chain(self.sheets.iter().flat_map(|s| s.audit.iter()))
    }

    pub fn summary(&self) -> AnalysisSummary {
        let mut overall = HierarchyStats::default();
        let sheets: Vec<SheetSummary> = self
            .question_sheets()
            .map(|sheet| {
                let stats = sheet.hierarchy_stats();
                overall.merge(&stats);
                let detection_confidence = if sheet.columns.is_empty() {
                    0.0
                } else {
                    sheet
                        .columns
                        .iter()
                        .map(|c| c.classified.confidence)
                        .sum::<f32>()
                        / sheet.columns.len() as f32
                };
                SheetSummary {
                    sheet: sheet.sheet.clone(),
                    total_items: stats.total,
                    fillable: stats.fillable,
                    structural: stats.structural,
                    filled: sheet.assignments.iter().filter(|a| a.committed).count(),
                    preserved: sheet.preserved_rows.len(),
                    column_detection_confidence: detection_confidence,
                    hierarchy: stats,
                }
            })
            .collect();
        let fillable_percentage = if overall.total == 0 {
            0.0
        } else {
            overall.fillable as f64 * 100.0 / overall.total as f64
        };
        AnalysisSummary {
            source: self.source.clone(),
            content_sheet: self.content_sheet.clone(),
            question_sheets: sheets.len(),
            total_sheets: self.sheets.len(),
            total_items: overall.total,
            fillable_items: overall.fillable,
            structural_items: overall.structural,
            fillable_percentage,
            audit_events: self.all_audit_events().count(),
            sheets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    pub sheet: String,
    pub total_items: usize,
    pub fillable: usize,
    pub structural: usize,
    pub filled: usize,
    pub preserved: usize,
    pub column_detection_confidence: f32,
    pub hierarchy: HierarchyStats,
}

/// Compact overview written next to the full report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub source: String,
    pub content_sheet: Option<String>,
    pub total_sheets: usize,
    pub question_sheets: usize,
    pub total_items: usize,
    pub fillable_items: usize,
    pub structural_items: usize,
    pub fillable_percentage: f64,
    pub audit_events: usize,
    pub sheets: Vec<SheetSummary>,
}
