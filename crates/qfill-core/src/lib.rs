//! Questionnaire pipeline orchestration.
//!
//! [`extract_document`] classifies the sheets of a workbook and infers the
//! question forest and fill strategy of every question sheet;
//! [`fill_document`] synthesizes responses from those results, which is also
//! how a saved report is filled again later. Both take a [`PipelineContext`]
//! carrying the oracle and the [`ProcessingOptions`].

pub mod pipeline;
pub mod pipeline_context;

// === Pipeline ===
pub use pipeline::{
    SheetOutcome, analyse_sheet, extract_document, extract_file, fill_document, process_document,
};

// === Context ===
pub use pipeline_context::{OracleSettings, PipelineContext, ProcessingOptions};
