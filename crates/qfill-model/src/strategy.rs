//! Fill strategies, response assignments and the value grid handed to writers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::question::NodeId;
use crate::roles::Source;

/// Tolerance used when validating that probabilities sum to one.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Positive,
    Negative,
    Partial,
    Answered,
    NotAnswered,
}

impl ResponseType {
    pub const ALL: [ResponseType; 5] = [
        Self::Positive,
        Self::Negative,
        Self::Partial,
        Self::Answered,
        Self::NotAnswered,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Partial => "partial",
            Self::Answered => "answered",
            Self::NotAnswered => "not_answered",
        }
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Self::Positive | Self::Answered => Polarity::Positive,
            Self::Negative | Self::NotAnswered => Polarity::Negative,
            Self::Partial => Polarity::Partial,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match wanted.as_str() {
            "yes" | "compliant" => return Ok(Self::Positive),
            "no" | "non_compliant" | "not_compliant" => return Ok(Self::Negative),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ModelError::UnknownResponseType(s.to_string()))
    }
}

/// Probability of each response type. Weights are validated on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(ResponseType, f64)>", into = "Vec<(ResponseType, f64)>")]
pub struct Distribution {
    weights: Vec<(ResponseType, f64)>,
}

impl Distribution {
    /// Build from probabilities that must already sum to one.
    pub fn new(weights: Vec<(ResponseType, f64)>) -> Result<Self> {
        if weights.is_empty() {
            return Err(ModelError::InvalidDistribution("no response types".into()));
        }
        if let Some((kind, w)) = weights.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            return Err(ModelError::InvalidDistribution(format!(
                "weight {w} for {kind} is not a non-negative number"
            )));
        }
        let mut seen = Vec::with_capacity(weights.len());
        for (kind, _) in &weights {
            if seen.contains(kind) {
                return Err(ModelError::InvalidDistribution(format!(
                    "{kind} listed twice"
                )));
            }
            seen.push(*kind);
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(ModelError::InvalidDistribution(format!(
                "probabilities sum to {total:.4}, expected 1"
            )));
        }
        Ok(Self { weights })
    }

    /// Build from relative weights (percentages or counts) by normalizing.
    pub fn from_weights(weights: Vec<(ResponseType, f64)>) -> Result<Self> {
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(ModelError::InvalidDistribution(
                "weights must sum to a positive number".into(),
            ));
        }
        Self::new(weights.into_iter().map(|(k, w)| (k, w / total)).collect())
    }

    /// 70% positive, 15% negative, 15% partial.
    pub fn compliance_default() -> Self {
        Self {
            weights: vec![
                (ResponseType::Positive, 0.70),
                (ResponseType::Negative, 0.15),
                (ResponseType::Partial, 0.15),
            ],
        }
    }

    /// 85% answered, 15% not answered.
    pub fn binary_default() -> Self {
        Self {
            weights: vec![
                (ResponseType::Answered, 0.85),
                (ResponseType::NotAnswered, 0.15),
            ],
        }
    }

    pub fn weights(&self) -> &[(ResponseType, f64)] {
        &self.weights
    }

    pub fn probability(&self, kind: ResponseType) -> f64 {
        self.weights
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0.0, |(_, w)| *w)
    }

    /// Exact counts per response type for `total` items using the
    /// largest-remainder method. The counts always sum to `total`.
    pub fn quotas(&self, total: usize) -> Vec<(ResponseType, usize)> {
        let exact: Vec<f64> = self.weights.iter().map(|(_, w)| w * total as f64).collect();
        let mut counts: Vec<usize> = exact.iter().map(|x| x.floor() as usize).collect();
        let assigned: usize = counts.iter().sum();
        let mut order: Vec<usize> = (0..exact.len()).collect();
        // Larger remainder first; earlier type wins ties.
        order.sort_by(|a, b| {
            let ra = exact[*a] - exact[*a].floor();
            let rb = exact[*b] - exact[*b].floor();
            rb.total_cmp(&ra).then(a.cmp(b))
        });
        for i in order.into_iter().take(total.saturating_sub(assigned)) {
            counts[i] += 1;
        }
        self.weights
            .iter()
            .zip(counts)
            .map(|((kind, _), count)| (*kind, count))
            .collect()
    }
}

impl TryFrom<Vec<(ResponseType, f64)>> for Distribution {
    type Error = ModelError;

    fn try_from(weights: Vec<(ResponseType, f64)>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<Distribution> for Vec<(ResponseType, f64)> {
    fn from(value: Distribution) -> Self {
        value.weights
    }
}

/// Family of values a column generator draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "family", content = "for", rename_all = "snake_case")]
pub enum ValueFamily {
    /// Yes / No / Partial style answers.
    Status,
    /// Free-text explanation or comment.
    Explanation,
    /// Reference to supporting documents.
    Evidence,
    Date,
    Numeric,
    Cost,
    /// One column of a checkbox matrix; marked only for its own polarity.
    Mark(Polarity),
    Generic,
}

impl ValueFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Explanation => "explanation",
            Self::Evidence => "evidence",
            Self::Date => "date",
            Self::Numeric => "numeric",
            Self::Cost => "cost",
            Self::Mark(_) => "mark",
            Self::Generic => "generic",
        }
    }

    /// Whether a blank cell is a legitimate output of this family.
    pub fn allows_blank(self) -> bool {
        matches!(self, Self::Explanation | Self::Mark(_))
    }
}

impl FromStr for ValueFamily {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" | "compliance" => Ok(Self::Status),
            "explanation" | "comment" | "comments" => Ok(Self::Explanation),
            "evidence" | "reference" => Ok(Self::Evidence),
            "date" => Ok(Self::Date),
            "numeric" | "number" => Ok(Self::Numeric),
            "cost" | "price" => Ok(Self::Cost),
            "generic" | "text" => Ok(Self::Generic),
            _ => Err(ModelError::UnknownValueFamily(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    pub column: usize,
    pub header: String,
    pub family: ValueFamily,
    pub allow_blank: bool,
    /// Which tier picked the family.
    pub source: Source,
}

/// Condition on a trigger column's value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "values", rename_all = "snake_case")]
pub enum ValuePattern {
    /// Case-insensitive match against any of the listed values.
    OneOf(Vec<String>),
    NonEmpty,
    Empty,
}

impl ValuePattern {
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::OneOf(values) => values.iter().any(|v| v.eq_ignore_ascii_case(value)),
            Self::NonEmpty => !value.is_empty(),
            Self::Empty => value.is_empty(),
        }
    }
}

/// What a rule does to its dependent columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum RuleEffect {
    /// Overwrite with a templated justification for the row's response.
    Justification,
    /// Set the value only when the dependent is blank.
    FillIfBlank(String),
    /// Overwrite with a fixed value.
    Force(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossColumnRule {
    pub trigger_column: usize,
    pub pattern: ValuePattern,
    pub dependents: Vec<usize>,
    pub effect: RuleEffect,
}

/// Per-sheet fill descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillStrategy {
    pub sheet: String,
    pub distribution: Distribution,
    pub distribution_source: Source,
    pub generators: Vec<GeneratorSpec>,
    pub rules: Vec<CrossColumnRule>,
}

impl FillStrategy {
    pub fn generator(&self, column: usize) -> Option<&GeneratorSpec> {
        self.generators.iter().find(|g| g.column == column)
    }
}

/// Outcome of synthesis for one fillable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseAssignment {
    pub node: NodeId,
    pub row: usize,
    pub response: ResponseType,
    pub values: BTreeMap<usize, String>,
    /// False when another node of the same row already owns the row's cells.
    pub committed: bool,
}

/// Synthesized cell values of one sheet, keyed by `(row, column)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueGrid {
    pub sheet: String,
    #[serde(with = "grid_cells")]
    cells: BTreeMap<(usize, usize), String>,
}

impl ValueGrid {
    pub fn new(sheet: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn contains_row(&self, row: usize) -> bool {
        self.cells.range((row, 0)..=(row, usize::MAX)).next().is_some()
    }

    /// Write every value of a row at once.
    pub fn commit_row(&mut self, row: usize, values: &BTreeMap<usize, String>) {
        for (column, value) in values {
            self.cells.insert((row, *column), value.clone());
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&str> {
        self.cells.get(&(row, column)).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &str)> {
        self.cells
            .iter()
            .map(|((row, column), value)| (*row, *column, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// JSON objects need string keys, so cells are stored as a list.
mod grid_cells {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Cell {
        row: usize,
        column: usize,
        value: String,
    }

    pub fn serialize<S: Serializer>(
        cells: &BTreeMap<(usize, usize), String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<Cell> = cells
            .iter()
            .map(|((row, column), value)| Cell {
                row: *row,
                column: *column,
                value: value.clone(),
            })
            .collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<(usize, usize), String>, D::Error> {
        let list = Vec::<Cell>::deserialize(deserializer)?;
        Ok(list
            .into_iter()
            .map(|cell| ((cell.row, cell.column), cell.value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribution_rejects_bad_sums() {
        let err = Distribution::new(vec![
            (ResponseType::Positive, 0.5),
            (ResponseType::Negative, 0.4),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn percentages_are_normalized() {
        let dist = Distribution::from_weights(vec![
            (ResponseType::Positive, 70.0),
            (ResponseType::Negative, 15.0),
            (ResponseType::Partial, 15.0),
        ])
        .unwrap();
        assert!((dist.probability(ResponseType::Positive) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn quotas_sum_to_total() {
        let dist = Distribution::compliance_default();
        for total in [0, 1, 7, 50, 101] {
            let quotas = dist.quotas(total);
            assert_eq!(quotas.iter().map(|(_, n)| n).sum::<usize>(), total);
        }
        let quotas = dist.quotas(20);
        assert_eq!(
            quotas,
            vec![
                (ResponseType::Positive, 14),
                (ResponseType::Negative, 3),
                (ResponseType::Partial, 3),
            ]
        );
    }

    #[test]
    fn value_pattern_is_case_insensitive() {
        let pattern = ValuePattern::OneOf(vec!["No".into(), "Partial".into()]);
        assert!(pattern.matches(" no "));
        assert!(!pattern.matches("Yes"));
    }

    #[test]
    fn grid_round_trips_through_json() {
        let mut grid = ValueGrid::new("Reqs");
        let values = BTreeMap::from([(2, "Yes".to_string()), (3, String::new())]);
        grid.commit_row(5, &values);
        let json = serde_json::to_string(&grid).unwrap();
        let back: ValueGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert!(back.contains_row(5));
        assert!(!back.contains_row(4));
    }
}
