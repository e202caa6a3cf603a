//! Response synthesis for questionnaire sheets.
//!
//! [`ContextBuilder`] reads document-wide context, [`FillStrategyResolver`]
//! decides how each sheet is answered and [`ResponseSynthesizer`] produces
//! the values, seeded from stable row identity so runs are reproducible.

pub mod context;
pub mod generator;
pub mod strategy;
pub mod synonyms;
pub mod synthesizer;

// === Document context ===
pub use context::{ContextBuilder, context_from_lines, sheet_lines};

// === Strategy ===
pub use strategy::FillStrategyResolver;
pub use synonyms::{FUZZY_THRESHOLD, family_for_header, mark_polarity};

// === Values ===
pub use generator::{
    COMMENTS_POOL, COST_POOL, GENERIC_POOL, MARK, POSITIVE_FILL, STATUS_POOL, ValueGenerator,
    ValuePool, justification, pool,
};

// === Synthesis ===
pub use synthesizer::{ResponseSynthesizer, RowKey, SynthesisOutput};
