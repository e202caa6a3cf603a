use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
    #[error("unknown response type: {0}")]
    UnknownResponseType(String),
    #[error("unknown value family: {0}")]
    UnknownValueFamily(String),
    #[error("node {0} is not part of this forest")]
    UnknownNode(usize),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Recoverable conditions raised while inferring structure or synthesizing
/// responses. They never abort processing; each is recorded in the audit
/// trail of the sheet that raised it.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    #[error("oracle unavailable: {detail}")]
    OracleUnavailable { detail: String },
    #[error("ambiguous classification (margin {margin:.2} below {threshold:.2})")]
    AmbiguousClassification { margin: f32, threshold: f32 },
    #[error("malformed cell at row {row}: {detail}")]
    MalformedCell { row: usize, detail: String },
    #[error("sheet has no data rows")]
    EmptySheet,
    #[error("no generator matched column {column}")]
    StrategyUnresolved { column: usize },
    #[error("{cells} answer cell(s) already filled in the source")]
    ExistingAnswers { cells: usize },
}

impl Condition {
    pub fn oracle(detail: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            detail: detail.into(),
        }
    }

    /// Short machine-friendly name, used in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OracleUnavailable { .. } => "oracle_unavailable",
            Self::AmbiguousClassification { .. } => "ambiguous_classification",
            Self::MalformedCell { .. } => "malformed_cell",
            Self::EmptySheet => "empty_sheet",
            Self::StrategyUnresolved { .. } => "strategy_unresolved",
            Self::ExistingAnswers { .. } => "existing_answers",
        }
    }
}

/// Where an audit event was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum AuditScope {
    Sheet,
    Column { index: usize },
    Row { index: usize },
    Strategy,
    Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub sheet: String,
    #[serde(flatten)]
    pub scope: AuditScope,
    pub condition: Condition,
    /// What the engine did instead.
    pub resolution: String,
}

impl AuditEvent {
    pub fn new(
        sheet: impl Into<String>,
        scope: AuditScope,
        condition: Condition,
        resolution: impl Into<String>,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            scope,
            condition,
            resolution: resolution.into(),
        }
    }
}
