//! Role classification for questionnaire workbooks.
//!
//! Sheets and columns are classified by a [`Cascade`] of three tiers:
//!
//! 1. **Oracle**: an external model picks a role from the candidate list.
//! 2. **Statistical**: rules and weighted scores over [`ColumnStats`](qfill_model::ColumnStats)
//!    and [`SheetProfile`](qfill_ingest::SheetProfile).
//! 3. **Default**: positional guesses that always produce a role.
//!
//! Every result carries its confidence, the tier that produced it and the
//! trail of deferrals that led there.

pub mod cascade;
pub mod column;
pub mod score;
pub mod sheet;

pub use cascade::{Cascade, CascadeResult, oracle_tier};
pub use column::{
    ColumnClassifier, ColumnTarget, default_column_role, deferral_events, resolve_layout,
    statistical_column_role,
};
pub use score::{ConfidenceLevel, ConfidenceThresholds, RoleScore, answer_score, question_score};
pub use sheet::{SheetClassifier, SheetTarget, select_content_sheet, statistical_sheet_role};
