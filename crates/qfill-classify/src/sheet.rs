//! Sheet role classification and content sheet selection.

use qfill_ingest::SheetProfile;
use qfill_model::{
    AuditEvent, AuditScope, Classified, ColumnStats, Condition, SheetClassification, SheetRole,
    SheetSnapshot, Source, TierAttempt, TierOutcome,
};
use qfill_oracle::{ClassificationRequest, ClassificationTarget, Oracle};
use tracing::{debug, info, warn};

use crate::cascade::{Cascade, oracle_tier};
use crate::column::deferral_events;

/// Sheets with at least this many rows are never content sheets.
pub const CONTENT_SHEET_MAX_ROWS: usize = 50;
/// Instruction phrase hits needed before a sheet reads as content.
pub const CONTENT_MIN_HITS: usize = 3;
/// Data rows needed before a sheet reads as a question sheet.
pub const QUESTION_SHEET_MIN_ROWS: usize = 5;

const ORACLE_SAMPLE_ROWS: usize = 10;
const ORACLE_SAMPLE_COLUMNS: usize = 5;

/// A sheet together with the evidence computed for it.
#[derive(Debug, Clone, Copy)]
pub struct SheetTarget<'s> {
    pub sheet: &'s SheetSnapshot,
    pub stats: &'s [ColumnStats],
    pub profile: &'s SheetProfile,
}

/// Rule-based sheet role from keyword density and column shape.
pub fn statistical_sheet_role(profile: &SheetProfile) -> TierOutcome<SheetRole> {
    let p = profile;
    if p.data_rows < CONTENT_SHEET_MAX_ROWS
        && p.content_hits > p.question_hits
        && p.content_hits > CONTENT_MIN_HITS
    {
        let lead = (p.content_hits - p.question_hits) as f32;
        return TierOutcome::resolved(SheetRole::Content, (0.6 + 0.05 * lead).min(0.9));
    }
    let has_text = p.long_text_columns > 0;
    let has_labels = p.short_label_columns > 0;
    if has_text && has_labels {
        if p.data_rows >= QUESTION_SHEET_MIN_ROWS {
            return TierOutcome::resolved(SheetRole::Question, 0.85);
        }
        // Right shape, too few rows to be sure.
        return TierOutcome::Deferred(Condition::AmbiguousClassification {
            margin: 0.0,
            threshold: QUESTION_SHEET_MIN_ROWS as f32,
        });
    }
    if has_text {
        return TierOutcome::Deferred(Condition::AmbiguousClassification {
            margin: 0.0,
            threshold: 1.0,
        });
    }
    TierOutcome::resolved(SheetRole::Reference, 0.6)
}

fn sheet_request(target: &SheetTarget<'_>) -> ClassificationRequest {
    let samples = target
        .sheet
        .rows
        .iter()
        .take(ORACLE_SAMPLE_ROWS)
        .map(|row| {
            row.cells
                .values()
                .take(ORACLE_SAMPLE_COLUMNS)
                .map(qfill_model::CellValue::as_text)
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect();
    ClassificationRequest {
        target: ClassificationTarget::Sheet,
        sheet: target.sheet.name.clone(),
        header: target.sheet.name.clone(),
        samples,
        stats: None,
        candidates: SheetRole::ALL
            .iter()
            .map(|role| role.as_str().to_string())
            .collect(),
    }
}

/// Classifies every sheet of a document.
pub struct SheetClassifier<'o> {
    oracle: &'o dyn Oracle,
    content_override: Option<String>,
}

impl<'o> SheetClassifier<'o> {
    pub fn new(oracle: &'o dyn Oracle) -> Self {
        Self {
            oracle,
            content_override: None,
        }
    }

    /// Treat the named sheet as the content sheet without classifying it.
    #[must_use]
    pub fn with_content_override(mut self, sheet: Option<String>) -> Self {
        self.content_override = sheet;
        self
    }

    fn is_override(&self, target: &SheetTarget<'_>) -> bool {
        self.content_override.as_deref() == Some(target.sheet.name.as_str())
    }

    /// Classify all sheets. The audit events cover deferrals, empty sheets
    /// and overrides.
    pub fn classify(
        &self,
        targets: &[SheetTarget<'_>],
    ) -> (Vec<SheetClassification>, Vec<AuditEvent>) {
        // Default tier: with several cascaded sheets, the one with the least
        // text is taken as the content sheet. Overridden and empty sheets
        // never reach the cascade, so they are left out of the comparison.
        let cascaded: Vec<&SheetTarget<'_>> = targets
            .iter()
            .filter(|t| !self.is_override(t) && t.profile.data_rows > 0)
            .collect();
        let smallest = if cascaded.len() > 1 {
            cascaded
                .iter()
                .min_by_key(|t| t.profile.text_volume)
                .map(|t| t.sheet.name.clone())
        } else {
            None
        };
        let oracle = self.oracle;
        let cascade = Cascade::new(move |target: &SheetTarget<'_>| {
            if smallest.as_deref() == Some(target.sheet.name.as_str()) {
                (SheetRole::Content, 0.3)
            } else {
                (SheetRole::Question, 0.3)
            }
        })
        .tier(Source::Oracle, move |target: &SheetTarget<'_>| {
            oracle_tier(oracle, &sheet_request(target))
        })
        .tier(Source::Statistical, |target: &SheetTarget<'_>| {
            statistical_sheet_role(target.profile)
        });

        let mut events = Vec::new();
        let classifications = targets
            .iter()
            .map(|target| {
                let name = target.sheet.name.clone();
                if self.is_override(target) {
                    info!(sheet = %name, "Content sheet set by override");
                    return SheetClassification {
                        sheet: name,
                        classified: Classified::new(SheetRole::Content, 1.0, Source::Override),
                        trail: Vec::new(),
                    };
                }
                if target.profile.data_rows == 0 {
                    events.push(AuditEvent::new(
                        &name,
                        AuditScope::Sheet,
                        Condition::EmptySheet,
                        "classified as reference and skipped",
                    ));
                    return SheetClassification {
                        sheet: name,
                        classified: Classified::new(SheetRole::Reference, 1.0, Source::Statistical),
                        trail: vec![TierAttempt {
                            source: Source::Statistical,
                            resolved: true,
                            condition: Some(Condition::EmptySheet),
                        }],
                    };
                }
                let result = cascade.run(target);
                events.extend(deferral_events(&name, &AuditScope::Sheet, &result.trail));
                debug!(
                    sheet = %name,
                    role = %result.classified.role,
                    confidence = result.classified.confidence,
                    source = %result.classified.source,
                    "Classified sheet"
                );
                SheetClassification {
                    sheet: name,
                    classified: result.classified,
                    trail: result.trail,
                }
            })
            .collect();
        (classifications, events)
    }
}

/// Choose the document's content sheet.
///
/// Priority: a valid override, then the most confident `Content` sheet
/// (ties broken by instruction keyword hits, then position), then none.
pub fn select_content_sheet(
    classifications: &[SheetClassification],
    profiles: &[&SheetProfile],
    content_override: Option<&str>,
) -> Option<String> {
    if let Some(name) = content_override {
        if classifications.iter().any(|c| c.sheet == name) {
            return Some(name.to_string());
        }
        warn!(sheet = name, "Content sheet override names no sheet; detecting instead");
    }
    classifications
        .iter()
        .zip(profiles)
        .filter(|(c, _)| c.classified.role == SheetRole::Content)
        .fold(None::<(&SheetClassification, &SheetProfile)>, |best, candidate| {
            match best {
                Some(b)
                    if (b.0.classified.confidence, b.1.content_hits)
                        >= (candidate.0.classified.confidence, candidate.1.content_hits) =>
                {
                    Some(b)
                }
                _ => Some((candidate.0, *candidate.1)),
            }
        })
        .map(|(c, _)| c.sheet.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(
        data_rows: usize,
        content: usize,
        question: usize,
        text: usize,
        labels: usize,
    ) -> SheetProfile {
        SheetProfile {
            data_rows,
            content_hits: content,
            question_hits: question,
            long_text_columns: text,
            short_label_columns: labels,
            text_volume: 100,
        }
    }

    #[test]
    fn instruction_heavy_small_sheet_is_content() {
        let outcome = statistical_sheet_role(&profile(8, 6, 1, 1, 0));
        assert!(matches!(
            outcome,
            TierOutcome::Resolved {
                role: SheetRole::Content,
                ..
            }
        ));
    }

    #[test]
    fn text_and_label_columns_make_a_question_sheet() {
        assert_eq!(
            statistical_sheet_role(&profile(40, 1, 12, 1, 2)),
            TierOutcome::resolved(SheetRole::Question, 0.85)
        );
    }

    #[test]
    fn text_without_labels_defers() {
        assert!(!statistical_sheet_role(&profile(40, 0, 5, 1, 0)).is_resolved());
    }

    #[test]
    fn lookup_tables_are_reference() {
        assert_eq!(
            statistical_sheet_role(&profile(30, 0, 0, 0, 2)),
            TierOutcome::resolved(SheetRole::Reference, 0.6)
        );
    }

    #[test]
    fn default_content_ignores_empty_sheets() {
        let names = ["Notes", "Brief", "Reqs"];
        let sheets: Vec<SheetSnapshot> = names
            .iter()
            .map(|name| SheetSnapshot::from_text_grid(*name, &[vec![*name]]))
            .collect();
        let profiles = [
            SheetProfile {
                text_volume: 5,
                ..profile(0, 0, 0, 0, 0)
            },
            SheetProfile {
                text_volume: 200,
                ..profile(3, 0, 0, 1, 0)
            },
            SheetProfile {
                text_volume: 5_000,
                ..profile(40, 0, 0, 1, 0)
            },
        ];
        let targets: Vec<SheetTarget<'_>> = sheets
            .iter()
            .zip(&profiles)
            .map(|(sheet, profile)| SheetTarget {
                sheet,
                stats: &[],
                profile,
            })
            .collect();

        let oracle = qfill_oracle::NoOracle;
        let (classified, _) = SheetClassifier::new(&oracle).classify(&targets);
        let roles: Vec<(SheetRole, Source)> = classified
            .iter()
            .map(|c| (c.classified.role, c.classified.source))
            .collect();
        assert_eq!(
            roles,
            vec![
                (SheetRole::Reference, Source::Statistical),
                (SheetRole::Content, Source::Default),
                (SheetRole::Question, Source::Default),
            ]
        );
    }

    #[test]
    fn override_beats_detection() {
        let c = |name: &str, role, confidence| SheetClassification {
            sheet: name.to_string(),
            classified: Classified::new(role, confidence, Source::Statistical),
            trail: vec![],
        };
        let classifications = vec![
            c("Intro", SheetRole::Content, 0.7),
            c("Guide", SheetRole::Content, 0.9),
            c("Reqs", SheetRole::Question, 0.85),
        ];
        let p = profile(5, 5, 0, 1, 0);
        let profiles = vec![&p, &p, &p];
        assert_eq!(
            select_content_sheet(&classifications, &profiles, None),
            Some("Guide".to_string())
        );
        assert_eq!(
            select_content_sheet(&classifications, &profiles, Some("Intro")),
            Some("Intro".to_string())
        );
        assert_eq!(
            select_content_sheet(&classifications, &profiles, Some("Missing")),
            Some("Guide".to_string())
        );
    }
}
