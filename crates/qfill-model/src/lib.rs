pub mod context;
pub mod error;
pub mod options;
pub mod question;
pub mod report;
pub mod roles;
pub mod sheet;
pub mod strategy;

pub use context::GlobalContext;
pub use error::{AuditEvent, AuditScope, Condition, ModelError, Result};
pub use options::{OracleSettings, ProcessingOptions};
pub use question::{HierarchyStats, NewNode, NodeId, QuestionForest, QuestionKind, QuestionNode};
pub use report::{AnalysisSummary, DocumentReport, SheetClassification, SheetReport, SheetSummary};
pub use roles::{
    Classified, ColumnClassification, ColumnLayout, ColumnRole, ColumnStats, SheetRole, Source,
    TierAttempt, TierOutcome, TypeHint,
};
pub use sheet::{CellValue, RowSample, SheetSnapshot};
pub use strategy::{
    CrossColumnRule, Distribution, FillStrategy, GeneratorSpec, Polarity, ResponseAssignment,
    ResponseType, RuleEffect, ValueFamily, ValueGrid, ValuePattern,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_event_serializes_with_flat_scope() {
        let event = AuditEvent::new(
            "Security",
            AuditScope::Column { index: 3 },
            Condition::oracle("timed out after 30s"),
            "statistical tier used",
        );
        let json = serde_json::to_value(&event).expect("serialize event");
        assert_eq!(json["scope"], "column");
        assert_eq!(json["index"], 3);
        assert_eq!(json["condition"]["kind"], "oracle_unavailable");
        let back: AuditEvent = serde_json::from_value(json).expect("deserialize event");
        assert_eq!(back, event);
    }

    #[test]
    fn summary_counts_question_sheets_only() {
        let classification = SheetClassification {
            sheet: "Intro".to_string(),
            classified: Classified::new(SheetRole::Content, 0.9, Source::Statistical),
            trail: vec![],
        };
        let report = DocumentReport {
            source: "rfi.xlsx".to_string(),
            global_context: GlobalContext::generic(),
            content_sheet: Some("Intro".to_string()),
            sheets: vec![SheetReport::new(classification)],
            audit: vec![],
        };
        let summary = report.summary();
        assert_eq!(summary.total_sheets, 1);
        assert_eq!(summary.question_sheets, 0);
        assert_eq!(summary.fillable_percentage, 0.0);
    }
}
