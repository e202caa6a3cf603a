//! CLI library components for `qfill`.
//!
//! The binary lives in `main.rs`; the pieces here are shared with tests.

pub mod distribution;
pub mod logging;
pub mod summary;
pub mod types;
