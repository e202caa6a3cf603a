//! Seeded response synthesis: draw, generate, reconcile, commit.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use qfill_model::{
    AuditEvent, AuditScope, Condition, FillStrategy, NodeId, QuestionForest, QuestionNode,
    ResponseAssignment, ResponseType, RuleEffect, ValueGrid,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::generator::{STATUS_POOL, ValueGenerator, justification};

/// Stable identity of a physical row, used to derive every seed for it.
#[derive(Debug, Clone, Copy)]
pub struct RowKey<'a> {
    pub salt: u64,
    pub sheet: &'a str,
    pub row: usize,
}

impl RowKey<'_> {
    fn digest(&self, parts: &[u64]) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.to_le_bytes());
        hasher.update(self.sheet.as_bytes());
        hasher.update([0u8]);
        hasher.update((self.row as u64).to_le_bytes());
        for part in parts {
            hasher.update(part.to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Ranking key for the response draw.
    pub fn rank(&self, node: NodeId) -> u64 {
        self.digest(&[0, node.0 as u64])
    }

    pub fn column_rng(&self, column: usize) -> StdRng {
        StdRng::seed_from_u64(self.digest(&[1, column as u64]))
    }

    pub fn rule_rng(&self, column: usize, rule: usize) -> StdRng {
        StdRng::seed_from_u64(self.digest(&[2, column as u64, rule as u64]))
    }
}

/// Everything synthesized for one sheet.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub assignments: Vec<ResponseAssignment>,
    pub grid: ValueGrid,
    /// Rows holding at least one answer the source already had.
    pub preserved_rows: Vec<usize>,
    /// `(row, column)` of every answer cell kept as found.
    pub preserved_cells: Vec<(usize, usize)>,
    pub audit: Vec<AuditEvent>,
}

/// Fills every fillable node of a forest according to a strategy.
#[derive(Debug, Clone, Copy)]
pub struct ResponseSynthesizer {
    salt: u64,
    force_non_empty: bool,
    generator: ValueGenerator,
}

impl ResponseSynthesizer {
    pub fn new(salt: u64, reference_date: NaiveDate) -> Self {
        Self {
            salt,
            force_non_empty: false,
            generator: ValueGenerator::new(reference_date),
        }
    }

    /// Fill columns even when their generator allows blanks.
    #[must_use]
    pub fn with_force_non_empty(mut self, enable: bool) -> Self {
        self.force_non_empty = enable;
        self
    }

    fn key<'a>(&self, sheet: &'a str, row: usize) -> RowKey<'a> {
        RowKey {
            salt: self.salt,
            sheet,
            row,
        }
    }

    /// Response type per node, drawn with exact proportions.
    ///
    /// Quotas come from the largest-remainder method; nodes are ranked by
    /// their seeded key and take quotas in rank order.
    pub fn draw_responses(
        &self,
        sheet: &str,
        nodes: &[&QuestionNode],
        strategy: &FillStrategy,
    ) -> Vec<ResponseType> {
        let mut ranked: Vec<(u64, usize)> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let row = node.primary_row().unwrap_or_default();
                (self.key(sheet, row).rank(node.id), i)
            })
            .collect();
        ranked.sort_unstable();

        let mut responses = vec![ResponseType::Positive; nodes.len()];
        let mut slots = ranked.into_iter();
        for (kind, count) in strategy.distribution.quotas(nodes.len()) {
            for (_, i) in slots.by_ref().take(count) {
                responses[i] = kind;
            }
        }
        responses
    }

    /// Apply cross-column rules in strategy order. Applying it again to its
    /// own output changes nothing.
    pub fn reconcile(
        &self,
        strategy: &FillStrategy,
        key: &RowKey<'_>,
        response: ResponseType,
        values: &mut BTreeMap<usize, String>,
    ) {
        for (index, rule) in strategy.rules.iter().enumerate() {
            let trigger = values.get(&rule.trigger_column).cloned().unwrap_or_default();
            if !rule.pattern.matches(&trigger) {
                continue;
            }
            let polarity = STATUS_POOL
                .polarity_of(&trigger)
                .unwrap_or_else(|| response.polarity());
            for &dependent in &rule.dependents {
                match &rule.effect {
                    RuleEffect::Justification => {
                        let mut rng = key.rule_rng(dependent, index);
                        values.insert(dependent, justification(polarity, &mut rng));
                    }
                    RuleEffect::FillIfBlank(value) => {
                        let blank = values.get(&dependent).is_none_or(|v| v.trim().is_empty());
                        if blank {
                            values.insert(dependent, value.clone());
                        }
                    }
                    RuleEffect::Force(value) => {
                        values.insert(dependent, value.clone());
                    }
                }
            }
        }
    }

    /// Values for the node's unanswered columns before reconciliation.
    fn generate(
        &self,
        node: &QuestionNode,
        strategy: &FillStrategy,
        key: &RowKey<'_>,
        response: ResponseType,
    ) -> BTreeMap<usize, String> {
        strategy
            .generators
            .iter()
            .filter(|spec| node.answer_columns.contains(&spec.column))
            .filter(|spec| !node.existing_answers.contains_key(&spec.column))
            .map(|spec| {
                let mut rng = key.column_rng(spec.column);
                (spec.column, self.generator.generate(spec, response, &mut rng))
            })
            .collect()
    }

    /// Values for one node: existing answers take part in the rules but are
    /// never replaced. Returns only the cells to write.
    fn fill_node(
        &self,
        node: &QuestionNode,
        strategy: &FillStrategy,
        key: &RowKey<'_>,
        response: ResponseType,
    ) -> BTreeMap<usize, String> {
        let mut values = self.generate(node, strategy, key, response);
        values.extend(node.existing_answers.clone());
        self.reconcile(strategy, key, response, &mut values);
        self.fill_blanks(strategy, response, &mut values);
        values.retain(|column, _| !node.existing_answers.contains_key(column));
        values
    }

    /// True when every generated column of the node already has an answer.
    fn fully_answered(node: &QuestionNode, strategy: &FillStrategy) -> bool {
        !node.existing_answers.is_empty()
            && strategy
                .generators
                .iter()
                .filter(|spec| node.answer_columns.contains(&spec.column))
                .all(|spec| node.existing_answers.contains_key(&spec.column))
    }

    fn fill_blanks(
        &self,
        strategy: &FillStrategy,
        response: ResponseType,
        values: &mut BTreeMap<usize, String>,
    ) {
        for spec in &strategy.generators {
            let Some(value) = values.get_mut(&spec.column) else {
                continue;
            };
            if value.trim().is_empty() && (self.force_non_empty || !spec.allow_blank) {
                *value = self.generator.fallback(spec, response);
            }
        }
    }

    pub fn synthesize(&self, forest: &QuestionForest, strategy: &FillStrategy) -> SynthesisOutput {
        let sheet = forest.sheet.as_str();
        let fillable = forest.fillable();
        let kept: BTreeSet<(usize, usize)> = fillable
            .iter()
            .filter_map(|node| Some((node.primary_row()?, &node.existing_answers)))
            .flat_map(|(row, existing)| existing.keys().map(move |&column| (row, column)))
            .collect();
        let nodes: Vec<&QuestionNode> = fillable
            .into_iter()
            .filter(|node| !Self::fully_answered(node, strategy))
            .collect();
        let responses = self.draw_responses(sheet, &nodes, strategy);

        let mut grid = ValueGrid::new(sheet);
        let mut assignments = Vec::with_capacity(nodes.len());
        for (node, response) in nodes.iter().zip(responses) {
            let Some(row) = node.primary_row() else {
                continue;
            };
            let key = self.key(sheet, row);
            let values = self.fill_node(node, strategy, &key, response);

            // The first node of a row owns its cells.
            let committed = !grid.contains_row(row);
            if committed {
                grid.commit_row(row, &values);
            }
            assignments.push(ResponseAssignment {
                node: node.id,
                row,
                response,
                values,
                committed,
            });
        }

        let mut per_row: BTreeMap<usize, usize> = BTreeMap::new();
        for &(row, _) in &kept {
            *per_row.entry(row).or_default() += 1;
        }
        let audit = per_row
            .iter()
            .map(|(&row, &cells)| {
                AuditEvent::new(
                    sheet,
                    AuditScope::Row { index: row },
                    Condition::ExistingAnswers { cells },
                    "existing answers kept",
                )
            })
            .collect();

        debug!(
            sheet,
            assigned = assignments.len(),
            committed_cells = grid.len(),
            preserved = kept.len(),
            "Synthesized responses"
        );
        SynthesisOutput {
            assignments,
            grid,
            preserved_rows: per_row.into_keys().collect(),
            preserved_cells: kept.into_iter().collect(),
            audit,
        }
    }
}

#[cfg(test)]
mod tests {
    use qfill_model::{
        CrossColumnRule, Distribution, GeneratorSpec, NewNode, QuestionKind, Source, ValueFamily,
        ValuePattern,
    };

    use super::*;
    use crate::generator::POSITIVE_FILL;

    fn strategy() -> FillStrategy {
        let spec = |column, family: ValueFamily| GeneratorSpec {
            column,
            header: String::new(),
            family,
            allow_blank: family.allows_blank(),
            source: Source::Statistical,
        };
        FillStrategy {
            sheet: "Reqs".to_string(),
            distribution: Distribution::compliance_default(),
            distribution_source: Source::Default,
            generators: vec![spec(1, ValueFamily::Status), spec(2, ValueFamily::Explanation)],
            rules: vec![
                CrossColumnRule {
                    trigger_column: 1,
                    pattern: ValuePattern::OneOf(vec!["No".to_string(), "Partial".to_string()]),
                    dependents: vec![2],
                    effect: RuleEffect::Justification,
                },
                CrossColumnRule {
                    trigger_column: 1,
                    pattern: ValuePattern::OneOf(vec!["Yes".to_string()]),
                    dependents: vec![2],
                    effect: RuleEffect::FillIfBlank(POSITIVE_FILL.to_string()),
                },
            ],
        }
    }

    fn synthesizer() -> ResponseSynthesizer {
        ResponseSynthesizer::new(0, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default())
    }

    fn node(row: usize, existing: Option<&str>) -> NewNode {
        NewNode {
            row,
            text: format!("Question {row}"),
            level: 0,
            kind: QuestionKind::General,
            marker: None,
            answer_columns: vec![1, 2],
            existing_answers: existing
                .map(|v| BTreeMap::from([(1, v.to_string())]))
                .unwrap_or_default(),
        }
    }

    #[test]
    fn negative_status_overwrites_blank_explanation() {
        let synth = synthesizer();
        let key = RowKey {
            salt: 0,
            sheet: "Reqs",
            row: 4,
        };
        let mut values = BTreeMap::from([(1, "No".to_string()), (2, String::new())]);
        synth.reconcile(&strategy(), &key, ResponseType::Negative, &mut values);
        let explanation = &values[&2];
        assert!(!explanation.is_empty());
        assert_ne!(explanation, POSITIVE_FILL);
    }

    #[test]
    fn positive_status_only_fills_blank_explanation() {
        let synth = synthesizer();
        let key = RowKey {
            salt: 0,
            sheet: "Reqs",
            row: 4,
        };
        let mut values = BTreeMap::from([(1, "Yes".to_string()), (2, String::new())]);
        synth.reconcile(&strategy(), &key, ResponseType::Positive, &mut values);
        assert_eq!(values[&2], POSITIVE_FILL);

        let mut values = BTreeMap::from([
            (1, "Yes".to_string()),
            (2, "Standard feature".to_string()),
        ]);
        synth.reconcile(&strategy(), &key, ResponseType::Positive, &mut values);
        assert_eq!(values[&2], "Standard feature");
    }

    #[test]
    fn prefilled_rows_are_preserved() {
        let mut forest = QuestionForest::new("Reqs");
        let mut answered = node(1, Some("Yes"));
        answered.existing_answers.insert(2, "Native support".to_string());
        forest.insert(None, answered).unwrap();
        forest.insert(None, node(2, None)).unwrap();
        let out = synthesizer().synthesize(&forest, &strategy());
        assert_eq!(out.preserved_rows, vec![1]);
        assert_eq!(out.preserved_cells, vec![(1, 1), (1, 2)]);
        assert_eq!(out.assignments.len(), 1);
        assert!(!out.grid.contains_row(1));
        assert!(out.grid.contains_row(2));
        assert_eq!(out.audit.len(), 1);
        assert_eq!(out.audit[0].condition, Condition::ExistingAnswers { cells: 2 });
    }

    #[test]
    fn partial_rows_fill_only_their_blank_cells() {
        let mut forest = QuestionForest::new("Reqs");
        let mut partial = node(1, None);
        partial.existing_answers.insert(2, "Via SAML".to_string());
        forest.insert(None, partial).unwrap();
        forest.insert(None, node(2, None)).unwrap();
        let out = synthesizer()
            .with_force_non_empty(true)
            .synthesize(&forest, &strategy());

        let status = out.grid.get(1, 1).expect("status filled");
        assert!(!status.is_empty());
        assert_eq!(out.grid.get(1, 2), None);
        assert_eq!(out.preserved_cells, vec![(1, 2)]);
        assert_eq!(out.preserved_rows, vec![1]);
        let assignment = out.assignments.iter().find(|a| a.row == 1).expect("row 1");
        assert!(!assignment.values.contains_key(&2));
    }

    #[test]
    fn existing_status_still_drives_the_explanation() {
        let mut forest = QuestionForest::new("Reqs");
        forest.insert(None, node(5, Some("No"))).unwrap();
        let out = synthesizer().synthesize(&forest, &strategy());
        assert_eq!(out.grid.get(5, 1), None);
        let explanation = out.grid.get(5, 2).expect("explanation filled");
        assert!(!explanation.is_empty());
        assert_ne!(explanation, POSITIVE_FILL);
    }

    #[test]
    fn continuation_rows_get_their_blank_cells() {
        let mut forest = QuestionForest::new("Reqs");
        let parent = forest.insert(None, node(1, None)).unwrap();
        let continuation = NewNode {
            text: String::new(),
            kind: QuestionKind::Continuation,
            level: 1,
            ..node(2, Some("Partial"))
        };
        forest.insert(Some(parent), continuation).unwrap();
        let out = synthesizer().synthesize(&forest, &strategy());
        assert_eq!(out.grid.get(2, 1), None);
        assert!(out.grid.get(2, 2).is_some_and(|v| !v.is_empty()));
    }

    #[test]
    fn first_node_of_a_row_owns_it() {
        let mut forest = QuestionForest::new("Reqs");
        forest.insert(None, node(3, None)).unwrap();
        forest.insert(None, node(3, None)).unwrap();
        let out = synthesizer().synthesize(&forest, &strategy());
        let committed: Vec<bool> = out.assignments.iter().map(|a| a.committed).collect();
        assert_eq!(committed, vec![true, false]);
        assert_eq!(out.grid.len(), 2);
    }

    #[test]
    fn synthesis_is_reproducible_and_salted() {
        let mut forest = QuestionForest::new("Reqs");
        for row in 1..=20 {
            forest.insert(None, node(row, None)).unwrap();
        }
        let a = synthesizer().synthesize(&forest, &strategy());
        let b = synthesizer().synthesize(&forest, &strategy());
        assert_eq!(a.grid, b.grid);
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        let salted = ResponseSynthesizer::new(99, date).synthesize(&forest, &strategy());
        let responses = |out: &SynthesisOutput| {
            out.assignments
                .iter()
                .map(|x| x.response)
                .collect::<Vec<_>>()
        };
        assert_ne!(responses(&a), responses(&salted));
    }
}
