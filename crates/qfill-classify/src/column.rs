//! Column role classification and layout resolution for question sheets.

use qfill_ingest::{LONG_TEXT_THRESHOLD, header_tokens, sample_values};
use qfill_model::{
    AuditEvent, AuditScope, ColumnClassification, ColumnLayout, ColumnRole, ColumnStats, Condition,
    SheetSnapshot, Source, TierOutcome, TypeHint,
};
use qfill_oracle::{ClassificationRequest, ClassificationTarget, Oracle};
use tracing::debug;

use crate::cascade::{Cascade, oracle_tier};
use crate::score::{answer_score, question_score};

/// Minimum score gap for the weighted rule to pick a role.
pub const MARGIN_THRESHOLD: f32 = 0.15;
/// Fill ratio at or below which a long-text column is read as the question column.
pub const QUESTION_FILL_MAX: f64 = 0.3;
/// Sample values sent to the oracle per column.
pub const ORACLE_SAMPLE_VALUES: usize = 20;

const IDENTIFIER_HEADERS: &[&str] = &[
    "no", "nr", "id", "ref", "sl", "sr", "sn", "num", "number", "seq",
];

/// What the column tiers look at.
#[derive(Debug, Clone, Copy)]
pub struct ColumnTarget<'s> {
    pub sheet: &'s SheetSnapshot,
    pub stats: &'s ColumnStats,
    /// Position among the sheet's populated columns.
    pub position: usize,
}

fn is_identifier_header(header: &str) -> bool {
    let trimmed = header.trim();
    if trimmed == "#" {
        return true;
    }
    let tokens = header_tokens(trimmed);
    !tokens.is_empty()
        && tokens.len() <= 2
        && tokens.iter().all(|t| IDENTIFIER_HEADERS.contains(&t.as_str()))
}

/// Rule-based column role from statistics alone.
pub fn statistical_column_role(stats: &ColumnStats) -> TierOutcome<ColumnRole> {
    if stats.is_blank() {
        return TierOutcome::resolved(ColumnRole::Ignored, 0.95);
    }
    if is_identifier_header(&stats.header)
        && matches!(stats.type_hint, TypeHint::Numeric | TypeHint::ShortLabel)
        && stats.fill_ratio > 0.0
    {
        return TierOutcome::resolved(ColumnRole::Ignored, 0.85);
    }
    if stats.type_hint == TypeHint::LongText
        && stats.avg_length >= LONG_TEXT_THRESHOLD as f64
        && stats.fill_ratio <= QUESTION_FILL_MAX
    {
        return TierOutcome::resolved(ColumnRole::Question, 0.9);
    }
    if stats.type_hint == TypeHint::ShortLabel && stats.answer_keyword_hits > 0 {
        return TierOutcome::resolved(ColumnRole::Answer, 0.85);
    }

    let question = question_score(stats);
    let answer = answer_score(stats);
    let margin = (question.score - answer.score).abs();
    debug!(
        column = stats.index,
        question = %question.explain(),
        answer = %answer.explain(),
        margin,
        "Weighted column scores"
    );
    if margin < MARGIN_THRESHOLD {
        return TierOutcome::Deferred(Condition::AmbiguousClassification {
            margin,
            threshold: MARGIN_THRESHOLD,
        });
    }
    let role = if question.score > answer.score {
        ColumnRole::Question
    } else {
        ColumnRole::Answer
    };
    TierOutcome::resolved(role, (0.5 + margin / 2.0).min(0.8))
}

/// First populated column asks, the next answers, the rest are ignored.
pub fn default_column_role(position: usize) -> (ColumnRole, f32) {
    match position {
        0 => (ColumnRole::Question, 0.3),
        1 => (ColumnRole::Answer, 0.3),
        _ => (ColumnRole::Ignored, 0.2),
    }
}

fn column_request(target: &ColumnTarget<'_>) -> ClassificationRequest {
    ClassificationRequest {
        target: ClassificationTarget::Column,
        sheet: target.sheet.name.clone(),
        header: target.stats.header.clone(),
        samples: sample_values(target.sheet, target.stats.index, ORACLE_SAMPLE_VALUES),
        stats: Some(target.stats.clone()),
        candidates: ColumnRole::ALL
            .iter()
            .map(|role| role.as_str().to_string())
            .collect(),
    }
}

/// Classify every populated column of a question sheet.
pub struct ColumnClassifier<'o> {
    oracle: &'o dyn Oracle,
}

impl<'o> ColumnClassifier<'o> {
    pub fn new(oracle: &'o dyn Oracle) -> Self {
        Self { oracle }
    }

    pub fn classify(
        &self,
        sheet: &SheetSnapshot,
        stats: &[ColumnStats],
    ) -> Vec<ColumnClassification> {
        let oracle = self.oracle;
        let cascade = Cascade::new(|target: &ColumnTarget<'_>| default_column_role(target.position))
            .tier(Source::Oracle, move |target: &ColumnTarget<'_>| {
                oracle_tier(oracle, &column_request(target))
            })
            .tier(Source::Statistical, |target: &ColumnTarget<'_>| {
                statistical_column_role(target.stats)
            });
        stats
            .iter()
            .enumerate()
            .map(|(position, stats)| {
                let result = cascade.run(&ColumnTarget {
                    sheet,
                    stats,
                    position,
                });
                debug!(
                    sheet = %sheet.name,
                    column = stats.index,
                    role = %result.classified.role,
                    confidence = result.classified.confidence,
                    source = %result.classified.source,
                    "Classified column"
                );
                ColumnClassification {
                    index: stats.index,
                    header: stats.header.clone(),
                    classified: result.classified,
                    trail: result.trail,
                }
            })
            .collect()
    }
}

/// Audit events for every tier that deferred on the way to a result.
pub fn deferral_events(
    sheet: &str,
    scope: &AuditScope,
    trail: &[qfill_model::TierAttempt],
) -> Vec<AuditEvent> {
    let final_source = trail
        .iter()
        .find(|attempt| attempt.resolved)
        .map_or(Source::Default, |attempt| attempt.source);
    trail
        .iter()
        .filter_map(|attempt| {
            attempt.condition.clone().map(|condition| {
                let resolution = if attempt.resolved {
                    format!("{} tier resolved anyway", attempt.source)
                } else {
                    format!("{} tier deferred, {final_source} tier used", attempt.source)
                };
                AuditEvent::new(sheet, scope.clone(), condition, resolution)
            })
        })
        .collect()
}

/// Pick the primary question column and the answer columns.
///
/// The primary question column is the most confident `Question` column
/// (leftmost on ties). Without one, the first populated column is promoted.
/// Without any `Answer` column, the next populated column to the right of
/// the question column is used.
pub fn resolve_layout(
    sheet: &SheetSnapshot,
    columns: &[ColumnClassification],
) -> (ColumnLayout, Vec<AuditEvent>) {
    let mut events = Vec::new();

    let question_column = columns
        .iter()
        .filter(|c| c.classified.role == ColumnRole::Question)
        .fold(None::<&ColumnClassification>, |best, c| match best {
            Some(b) if b.classified.confidence >= c.classified.confidence => Some(b),
            _ => Some(c),
        })
        .map(|c| c.index);
    let question_column = match question_column {
        Some(column) => column,
        None => {
            let column = columns.first().map_or(0, |c| c.index);
            events.push(AuditEvent::new(
                &sheet.name,
                AuditScope::Column { index: column },
                Condition::AmbiguousClassification {
                    margin: 0.0,
                    threshold: MARGIN_THRESHOLD,
                },
                "no question column found, first populated column promoted",
            ));
            column
        }
    };

    let mut answer_columns: Vec<usize> = columns
        .iter()
        .filter(|c| c.classified.role == ColumnRole::Answer && c.index != question_column)
        .map(|c| c.index)
        .collect();
    if answer_columns.is_empty() {
        let column = columns
            .iter()
            .map(|c| c.index)
            .find(|index| *index > question_column)
            .unwrap_or(question_column + 1);
        events.push(AuditEvent::new(
            &sheet.name,
            AuditScope::Column { index: column },
            Condition::AmbiguousClassification {
                margin: 0.0,
                threshold: MARGIN_THRESHOLD,
            },
            "no answer column found, column right of the question column used",
        ));
        answer_columns.push(column);
    }

    let answer_headers = answer_columns
        .iter()
        .map(|column| sheet.header_text(*column))
        .collect();
    (
        ColumnLayout {
            question_column,
            answer_columns,
            answer_headers,
        },
        events,
    )
}

#[cfg(test)]
mod tests {
    use qfill_ingest::sheet_column_stats;
    use qfill_model::Classified;

    use super::*;

    fn stats(header: &str, avg_length: f64, fill_ratio: f64, hint: TypeHint) -> ColumnStats {
        ColumnStats {
            index: 0,
            header: header.to_string(),
            avg_length,
            fill_ratio,
            distinct_ratio: 1.0,
            long_text_ratio: if avg_length >= 100.0 { 1.0 } else { 0.0 },
            short_text_ratio: 0.0,
            numeric_ratio: 0.0,
            type_hint: hint,
            question_keyword_hits: qfill_ingest::keyword_hits(
                header,
                qfill_ingest::QUESTION_HEADER_KEYWORDS,
            ),
            answer_keyword_hits: qfill_ingest::keyword_hits(
                header,
                qfill_ingest::ANSWER_HEADER_KEYWORDS,
            ),
            non_empty: 2,
            total: 20,
        }
    }

    #[test]
    fn sparse_long_text_is_a_question_column() {
        let s = stats("Description", 150.0, 0.1, TypeHint::LongText);
        match statistical_column_role(&s) {
            TierOutcome::Resolved { role, confidence } => {
                assert_eq!(role, ColumnRole::Question);
                assert!(confidence >= 0.85);
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn labelled_status_column_is_an_answer_column() {
        let s = stats("Compliance Status", 0.0, 0.0, TypeHint::ShortLabel);
        assert_eq!(
            statistical_column_role(&s),
            TierOutcome::resolved(ColumnRole::Answer, 0.85)
        );
    }

    #[test]
    fn serial_number_column_is_ignored() {
        let s = stats("No.", 1.5, 1.0, TypeHint::Numeric);
        assert_eq!(
            statistical_column_role(&s),
            TierOutcome::resolved(ColumnRole::Ignored, 0.85)
        );
    }

    #[test]
    fn close_scores_defer() {
        let mut s = stats("Vendor input", 50.0, 0.5, TypeHint::Mixed);
        s.distinct_ratio = 0.5;
        s.answer_keyword_hits = 0;
        assert!(matches!(
            statistical_column_role(&s),
            TierOutcome::Deferred(Condition::AmbiguousClassification { .. })
        ));
    }

    fn classification(index: usize, role: ColumnRole, confidence: f32) -> ColumnClassification {
        ColumnClassification {
            index,
            header: String::new(),
            classified: Classified::new(role, confidence, Source::Statistical),
            trail: vec![],
        }
    }

    #[test]
    fn layout_prefers_most_confident_question_column() {
        let sheet = SheetSnapshot::from_text_grid(
            "S",
            &[vec!["Ref", "Section", "Requirement", "Response"]],
        );
        let columns = vec![
            classification(0, ColumnRole::Ignored, 0.85),
            classification(1, ColumnRole::Question, 0.6),
            classification(2, ColumnRole::Question, 0.9),
            classification(3, ColumnRole::Answer, 0.85),
        ];
        let (layout, events) = resolve_layout(&sheet, &columns);
        assert_eq!(layout.question_column, 2);
        assert_eq!(layout.answer_columns, vec![3]);
        assert_eq!(layout.answer_headers, vec!["Response".to_string()]);
        assert!(events.is_empty());
    }

    #[test]
    fn layout_falls_back_to_neighbouring_column() {
        let sheet = SheetSnapshot::from_text_grid("S", &[vec!["Question", "Notes"]]);
        let columns = vec![
            classification(0, ColumnRole::Question, 0.9),
            classification(1, ColumnRole::Ignored, 0.2),
        ];
        let (layout, events) = resolve_layout(&sheet, &columns);
        assert_eq!(layout.answer_columns, vec![1]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn offline_classification_of_a_simple_sheet() {
        let long = "The solution must support single sign-on through SAML 2.0 and \
                    OpenID Connect for all administrative and end-user interfaces.";
        let grid = vec![
            vec!["Requirement", "Response", "Comments"],
            vec![long, "", ""],
            vec![long, "", ""],
        ];
        let sheet = SheetSnapshot::from_text_grid("Reqs", &grid);
        let stats = sheet_column_stats(&sheet);
        let oracle = qfill_oracle::NoOracle;
        let columns = ColumnClassifier::new(&oracle).classify(&sheet, &stats);
        let roles: Vec<ColumnRole> = columns.iter().map(|c| c.classified.role).collect();
        assert_eq!(
            roles,
            vec![ColumnRole::Question, ColumnRole::Answer, ColumnRole::Answer]
        );
        assert!(columns.iter().all(|c| c.classified.source == Source::Statistical));
        assert!(!columns[0].trail[0].resolved);
    }
}
