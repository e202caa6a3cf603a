//! Oracle access for questionnaire inference.
//!
//! The [`Oracle`] trait is the narrow seam through which classification,
//! hierarchy, strategy and context questions reach an external model. The
//! engine only ever talks to it through [`ResilientOracle`], which adds a
//! timeout, bounded retries with exponential backoff and a global limit on
//! calls in flight.

mod error;
mod http;
mod oracle;
mod request;
mod resilient;
mod scripted;

// === Error Types ===
pub use error::{OracleError, Result};

// === Oracle Interface ===
pub use oracle::{NoOracle, Oracle, OracleReply};
pub use request::{
    ClassificationRequest, ClassificationTarget, ContextRequest, HierarchyItem, HierarchyLevel,
    HierarchyRequest, HierarchyVerdict, StrategyColumn, StrategyRequest, StrategyVerdict, Verdict,
};

// === Implementations ===
pub use http::{HttpOracle, parse_reply};
pub use resilient::{Limiter, Permit, ResilientOracle};
pub use scripted::ScriptedOracle;
