//! Question structure inference.
//!
//! [`parse_cell`] splits a single question cell into levelled fragments;
//! [`QuestionTreeBuilder`] stitches the fragments of every row of a sheet
//! into an arena-backed [`qfill_model::QuestionForest`].

pub mod hierarchy;
pub mod tree;

// === Cell parsing ===
pub use hierarchy::{Fragment, Marker, MarkerFamily, detect_marker, parse_cell, parse_cell_checked};

// === Forest construction ===
pub use tree::{ORACLE_CHUNK_ROWS, QuestionTreeBuilder, TreeOutput};
