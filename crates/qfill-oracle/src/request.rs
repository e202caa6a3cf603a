//! Requests sent to an oracle and the verdicts it may return.

use std::collections::BTreeMap;

use qfill_model::{ColumnStats, GlobalContext};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTarget {
    Sheet,
    Column,
}

/// Ask for the role of one sheet or column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub target: ClassificationTarget,
    pub sheet: String,
    /// Column header, or the sheet name for sheet targets.
    pub header: String,
    pub samples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ColumnStats>,
    /// Roles the verdict must choose from.
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub role: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyItem {
    pub row: usize,
    pub text: String,
}

/// Ask for the nesting level of consecutive question rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRequest {
    pub sheet: String,
    pub items: Vec<HierarchyItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyLevel {
    pub row: usize,
    pub level: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyVerdict {
    pub items: Vec<HierarchyLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyColumn {
    pub index: usize,
    pub header: String,
    pub samples: Vec<String>,
}

/// Ask how a question sheet should be answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRequest {
    pub sheet: String,
    pub context: GlobalContext,
    pub columns: Vec<StrategyColumn>,
    /// A few question texts for orientation.
    pub sample_questions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyVerdict {
    /// Response type name to probability or percentage.
    #[serde(default)]
    pub distribution: Option<BTreeMap<String, f64>>,
    /// Column index to value family name.
    #[serde(default)]
    pub families: BTreeMap<usize, String>,
}

/// Ask for document-wide context from the content sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRequest {
    pub sheet: String,
    pub lines: Vec<String>,
}
