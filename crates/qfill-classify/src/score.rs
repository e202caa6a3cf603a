//! Weighted feature scores for column roles.

use qfill_ingest::LONG_TEXT_THRESHOLD;
use qfill_model::{ColumnStats, TypeHint};

const LENGTH_WEIGHT: f32 = 0.35;
const FILL_WEIGHT: f32 = 0.20;
const DISTINCT_WEIGHT: f32 = 0.15;
const KEYWORD_WEIGHT: f32 = 0.20;
const TYPE_WEIGHT: f32 = 0.10;
/// Extra credit for an empty column whose header reads like a label.
const LABEL_TYPE_WEIGHT: f32 = 0.15;

/// Score for one candidate role.
#[derive(Debug, Clone)]
pub struct RoleScore {
    /// Weighted sum of the components, 0.0 to 1.0.
    pub score: f32,
    /// Breakdown of score components for explainability.
    pub explanation: Vec<ScoreComponent>,
}

impl RoleScore {
    fn from_components(explanation: Vec<ScoreComponent>) -> Self {
        let score = explanation.iter().map(|c| c.value).sum::<f32>().clamp(0.0, 1.0);
        Self { score, explanation }
    }

    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        self.explanation
            .iter()
            .map(|c| format!("{}: {:.0}%", c.name, c.value * 100.0))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// A component contributing to the final score.
#[derive(Debug, Clone)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub value: f32,
}

fn component(name: &'static str, value: f32) -> ScoreComponent {
    ScoreComponent { name, value }
}

fn length_norm(stats: &ColumnStats) -> f32 {
    (stats.avg_length / LONG_TEXT_THRESHOLD as f64).min(1.0) as f32
}

fn flag(condition: bool) -> f32 {
    if condition { 1.0 } else { 0.0 }
}

/// How much a column looks like the question column.
pub fn question_score(stats: &ColumnStats) -> RoleScore {
    RoleScore::from_components(vec![
        component("Text length", LENGTH_WEIGHT * length_norm(stats)),
        component("Fill ratio", FILL_WEIGHT * stats.fill_ratio as f32),
        component("Distinct values", DISTINCT_WEIGHT * stats.distinct_ratio as f32),
        component(
            "Header keywords",
            KEYWORD_WEIGHT * flag(stats.question_keyword_hits > 0),
        ),
        component(
            "Long text",
            TYPE_WEIGHT * flag(stats.type_hint == TypeHint::LongText),
        ),
    ])
}

/// How much a column looks like an answer column.
pub fn answer_score(stats: &ColumnStats) -> RoleScore {
    RoleScore::from_components(vec![
        component("Short text", LENGTH_WEIGHT * (1.0 - length_norm(stats))),
        component("Empty cells", FILL_WEIGHT * (1.0 - stats.fill_ratio as f32)),
        component(
            "Header keywords",
            KEYWORD_WEIGHT * flag(stats.answer_keyword_hits > 0),
        ),
        component(
            "Label column",
            LABEL_TYPE_WEIGHT * flag(stats.type_hint == TypeHint::ShortLabel),
        ),
    ])
}

/// Confidence level categories for classification quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfidenceLevel {
    /// Weak evidence; worth a manual look.
    Low,
    Medium,
    /// Near-certain.
    High,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Returns a human-readable description of the confidence level.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

/// Boundaries between confidence levels. Scores below `medium` are `Low`.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for high-quality classifications (default: 0.85).
    pub high: f32,
    /// Minimum confidence for medium-quality classifications (default: 0.60).
    pub medium: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.85,
            medium: 0.60,
        }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            high: 0.95,
            medium: 0.80,
        }
    }

    #[must_use]
    pub fn categorize(&self, confidence: f32) -> ConfidenceLevel {
        if confidence >= self.high {
            ConfidenceLevel::High
        } else if confidence >= self.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(avg_length: f64, fill_ratio: f64, hint: TypeHint) -> ColumnStats {
        ColumnStats {
            index: 0,
            header: String::new(),
            avg_length,
            fill_ratio,
            distinct_ratio: 1.0,
            long_text_ratio: 0.0,
            short_text_ratio: 0.0,
            numeric_ratio: 0.0,
            type_hint: hint,
            question_keyword_hits: 0,
            answer_keyword_hits: 0,
            non_empty: 10,
            total: 10,
        }
    }

    #[test]
    fn filled_sentences_score_as_questions() {
        let s = stats(70.0, 1.0, TypeHint::Mixed);
        assert!(question_score(&s).score > answer_score(&s).score + 0.3);
    }

    #[test]
    fn empty_label_columns_score_as_answers() {
        let mut s = stats(0.0, 0.0, TypeHint::ShortLabel);
        s.distinct_ratio = 0.0;
        let answer = answer_score(&s);
        assert!(answer.score > 0.6, "{}", answer.explain());
        assert!(question_score(&s).score < 0.1);
    }

    #[test]
    fn thresholds_categorize() {
        let t = ConfidenceThresholds::default();
        assert_eq!(t.categorize(0.9), ConfidenceLevel::High);
        assert_eq!(t.categorize(0.7), ConfidenceLevel::Medium);
        assert_eq!(t.categorize(0.3), ConfidenceLevel::Low);
    }
}
