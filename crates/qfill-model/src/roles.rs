//! Roles assigned to sheets and columns, and the statistics they are derived from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Condition;

/// Role of a whole sheet within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetRole {
    /// Instructions and guidelines, nothing to fill.
    Content,
    /// Rows of questions or requirements to answer.
    Question,
    /// Lookup tables, glossaries, anything else.
    Reference,
}

impl SheetRole {
    pub const ALL: [SheetRole; 3] = [Self::Content, Self::Question, Self::Reference];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Question => "question",
            Self::Reference => "reference",
        }
    }
}

/// Role of a column within a question sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Question,
    Answer,
    Ignored,
}

impl ColumnRole {
    pub const ALL: [ColumnRole; 3] = [Self::Question, Self::Answer, Self::Ignored];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Ignored => "ignored",
        }
    }
}

macro_rules! role_text {
    ($ty:ty, $label:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
                let wanted = wanted.trim_end_matches("_sheet").trim_end_matches("_column");
                <$ty>::ALL
                    .into_iter()
                    .find(|role| role.as_str() == wanted)
                    .ok_or_else(|| format!(concat!("unknown ", $label, " role: {}"), s))
            }
        }
    };
}

role_text!(SheetRole, "sheet");
role_text!(ColumnRole, "column");

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Oracle,
    Statistical,
    Default,
    /// Caller supplied the answer; the cascade was bypassed.
    Override,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Statistical => "statistical",
            Self::Default => "default",
            Self::Override => "override",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role together with the confidence and the tier that assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classified<R> {
    pub role: R,
    pub confidence: f32,
    pub source: Source,
}

impl<R> Classified<R> {
    pub fn new(role: R, confidence: f32, source: Source) -> Self {
        Self {
            role,
            confidence: confidence.clamp(0.0, 1.0),
            source,
        }
    }
}

/// What a single non-final tier reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome<R> {
    Resolved { role: R, confidence: f32 },
    Deferred(Condition),
}

impl<R> TierOutcome<R> {
    pub fn resolved(role: R, confidence: f32) -> Self {
        Self::Resolved { role, confidence }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// One entry of the per-target audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub source: Source,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

/// Coarse type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    LongText,
    ShortLabel,
    Numeric,
    Mixed,
}

/// Descriptive statistics of one column of a sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub index: usize,
    pub header: String,
    pub avg_length: f64,
    pub fill_ratio: f64,
    pub distinct_ratio: f64,
    /// Share of non-empty values longer than the long-text threshold.
    pub long_text_ratio: f64,
    /// Share of non-empty values shorter than the short-text threshold.
    pub short_text_ratio: f64,
    pub numeric_ratio: f64,
    pub type_hint: TypeHint,
    pub question_keyword_hits: usize,
    pub answer_keyword_hits: usize,
    pub non_empty: usize,
    pub total: usize,
}

impl ColumnStats {
    pub fn is_blank(&self) -> bool {
        self.non_empty == 0 && self.header.is_empty()
    }
}

/// Classification of one column plus the audit trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnClassification {
    pub index: usize,
    pub header: String,
    pub classified: Classified<ColumnRole>,
    pub trail: Vec<TierAttempt>,
}

/// Resolved question and answer columns of a question sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub question_column: usize,
    pub answer_columns: Vec<usize>,
    /// Header text per answer column, in the same order.
    pub answer_headers: Vec<String>,
}

impl ColumnLayout {
    pub fn header_for(&self, column: usize) -> Option<&str> {
        self.answer_columns
            .iter()
            .position(|c| *c == column)
            .and_then(|i| self.answer_headers.get(i))
            .map(String::as_str)
    }
}
