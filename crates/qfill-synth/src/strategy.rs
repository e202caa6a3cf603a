//! Per-sheet fill strategy: distribution, column generators and
//! cross-column rules.

use std::collections::{BTreeMap, BTreeSet};

use qfill_ingest::sample_values;
use qfill_model::{
    AuditEvent, AuditScope, ColumnLayout, Condition, CrossColumnRule, Distribution, FillStrategy,
    GeneratorSpec, GlobalContext, Polarity, QuestionForest, ResponseType, RuleEffect,
    SheetSnapshot, Source, ValueFamily, ValuePattern,
};
use qfill_oracle::{Oracle, OracleReply, StrategyColumn, StrategyRequest, StrategyVerdict};
use tracing::{debug, warn};

use crate::generator::{POSITIVE_FILL, STATUS_POOL};
use crate::synonyms::{family_for_header, mark_polarity};

const ORACLE_SAMPLE_VALUES: usize = 5;
const ORACLE_SAMPLE_QUESTIONS: usize = 5;

/// Resolves the [`FillStrategy`] of each question sheet.
pub struct FillStrategyResolver<'o> {
    oracle: &'o dyn Oracle,
    distribution: Option<Distribution>,
}

impl<'o> FillStrategyResolver<'o> {
    pub fn new(oracle: &'o dyn Oracle) -> Self {
        Self {
            oracle,
            distribution: None,
        }
    }

    /// Caller distribution that wins over the oracle and the defaults.
    #[must_use]
    pub fn with_distribution(mut self, distribution: Option<Distribution>) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn resolve(
        &self,
        sheet: &SheetSnapshot,
        layout: &ColumnLayout,
        forest: &QuestionForest,
        context: &GlobalContext,
    ) -> (FillStrategy, Vec<AuditEvent>) {
        let mut events = Vec::new();
        let verdict = self.ask_oracle(sheet, layout, forest, context, &mut events);

        let (distribution, distribution_source) =
            self.pick_distribution(&sheet.name, verdict.as_ref(), context, &mut events);
        let generators = column_generators(layout, verdict.as_ref());

        if !layout.answer_columns.is_empty()
            && generators.iter().all(|g| g.source == Source::Default)
        {
            let column = layout.answer_columns[0];
            warn!(sheet = %sheet.name, column, "No answer column matched a known family");
            events.push(AuditEvent::new(
                &sheet.name,
                AuditScope::Strategy,
                Condition::StrategyUnresolved { column },
                "generic generator used for every answer column",
            ));
        }

        let rules = cross_column_rules(&generators);
        debug!(
            sheet = %sheet.name,
            distribution_source = %distribution_source,
            generators = generators.len(),
            rules = rules.len(),
            "Resolved fill strategy"
        );
        (
            FillStrategy {
                sheet: sheet.name.clone(),
                distribution,
                distribution_source,
                generators,
                rules,
            },
            events,
        )
    }

    fn ask_oracle(
        &self,
        sheet: &SheetSnapshot,
        layout: &ColumnLayout,
        forest: &QuestionForest,
        context: &GlobalContext,
        events: &mut Vec<AuditEvent>,
    ) -> Option<StrategyVerdict> {
        let request = StrategyRequest {
            sheet: sheet.name.clone(),
            context: context.clone(),
            columns: layout
                .answer_columns
                .iter()
                .zip(&layout.answer_headers)
                .map(|(&index, header)| StrategyColumn {
                    index,
                    header: header.clone(),
                    samples: sample_values(sheet, index, ORACLE_SAMPLE_VALUES),
                })
                .collect(),
            sample_questions: forest
                .fillable()
                .iter()
                .filter(|node| !node.text.is_empty())
                .take(ORACLE_SAMPLE_QUESTIONS)
                .map(|node| node.text.clone())
                .collect(),
        };
        let detail = match self.oracle.strategy(&request) {
            Ok(OracleReply::Answer(verdict)) => return Some(verdict),
            Ok(OracleReply::Unable(reason)) => reason,
            Err(error) => error.to_string(),
        };
        events.push(AuditEvent::new(
            &sheet.name,
            AuditScope::Strategy,
            Condition::oracle(detail),
            "default distribution and header synonyms used",
        ));
        None
    }

    fn pick_distribution(
        &self,
        sheet: &str,
        verdict: Option<&StrategyVerdict>,
        context: &GlobalContext,
        events: &mut Vec<AuditEvent>,
    ) -> (Distribution, Source) {
        if let Some(distribution) = &self.distribution {
            return (distribution.clone(), Source::Override);
        }
        if let Some(weights) = verdict.and_then(|v| v.distribution.as_ref()) {
            match oracle_distribution(weights) {
                Ok(distribution) => return (distribution, Source::Oracle),
                Err(detail) => {
                    warn!(sheet, %detail, "Rejected oracle distribution");
                    events.push(AuditEvent::new(
                        sheet,
                        AuditScope::Strategy,
                        Condition::oracle(detail),
                        "default distribution used",
                    ));
                }
            }
        }
        let distribution = if context.is_compliance() {
            Distribution::compliance_default()
        } else {
            Distribution::binary_default()
        };
        (distribution, Source::Default)
    }
}

/// Parse an oracle distribution given as probabilities or percentages.
fn oracle_distribution(weights: &BTreeMap<String, f64>) -> Result<Distribution, String> {
    let parsed = weights
        .iter()
        .map(|(name, weight)| {
            name.parse::<ResponseType>()
                .map(|kind| (kind, *weight))
                .map_err(|e| e.to_string())
        })
        .collect::<Result<Vec<_>, _>>()?;
    Distribution::from_weights(parsed).map_err(|e| e.to_string())
}

/// Generators for every answer column: oracle hint, then checkbox-matrix
/// detection, then the synonym table, then the generic family.
fn column_generators(
    layout: &ColumnLayout,
    verdict: Option<&StrategyVerdict>,
) -> Vec<GeneratorSpec> {
    let marks: BTreeMap<usize, Polarity> = layout
        .answer_columns
        .iter()
        .zip(&layout.answer_headers)
        .filter_map(|(&column, header)| mark_polarity(header).map(|p| (column, p)))
        .collect();
    // A single "Compliant" column is a status column, not a matrix.
    let distinct: BTreeSet<Polarity> = marks.values().copied().collect();
    let is_matrix = distinct.len() >= 2;

    layout
        .answer_columns
        .iter()
        .zip(&layout.answer_headers)
        .map(|(&column, header)| {
            let hinted = verdict
                .and_then(|v| v.families.get(&column))
                .and_then(|name| name.parse::<ValueFamily>().ok());
            let (family, source) = if let Some(family) = hinted {
                (family, Source::Oracle)
            } else if let Some(polarity) = marks.get(&column).filter(|_| is_matrix) {
                (ValueFamily::Mark(*polarity), Source::Statistical)
            } else if let Some(family) = family_for_header(header) {
                (family, Source::Statistical)
            } else {
                (ValueFamily::Generic, Source::Default)
            };
            GeneratorSpec {
                column,
                header: header.clone(),
                family,
                allow_blank: family.allows_blank(),
                source,
            }
        })
        .collect()
}

/// Status columns drive their explanation and evidence columns.
fn cross_column_rules(generators: &[GeneratorSpec]) -> Vec<CrossColumnRule> {
    let pool_values = |polarities: &[Polarity]| {
        polarities
            .iter()
            .flat_map(|p| STATUS_POOL.values(*p))
            .map(|v| (*v).to_string())
            .collect::<Vec<_>>()
    };
    let mut rules = Vec::new();
    for status in generators.iter().filter(|g| g.family == ValueFamily::Status) {
        let dependents: Vec<usize> = generators
            .iter()
            .filter(|g| matches!(g.family, ValueFamily::Explanation | ValueFamily::Evidence))
            .map(|g| g.column)
            .collect();
        if dependents.is_empty() {
            continue;
        }
        rules.push(CrossColumnRule {
            trigger_column: status.column,
            pattern: ValuePattern::OneOf(pool_values(&[Polarity::Negative, Polarity::Partial])),
            dependents: dependents.clone(),
            effect: RuleEffect::Justification,
        });
        rules.push(CrossColumnRule {
            trigger_column: status.column,
            pattern: ValuePattern::OneOf(pool_values(&[Polarity::Positive])),
            dependents,
            effect: RuleEffect::FillIfBlank(POSITIVE_FILL.to_string()),
        });
    }
    rules
}
