use qfill_model::GlobalContext;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::request::{
    ClassificationRequest, ContextRequest, HierarchyRequest, HierarchyVerdict, StrategyRequest,
    StrategyVerdict, Verdict,
};

/// What an oracle said, when it said anything at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum OracleReply<T> {
    Answer(T),
    /// The oracle declined; the payload says why.
    Unable(String),
}

impl<T> OracleReply<T> {
    pub fn answer(self) -> Option<T> {
        match self {
            Self::Answer(value) => Some(value),
            Self::Unable(_) => None,
        }
    }
}

/// External intelligence used by the first tier of every cascade.
///
/// Every method may decline. Callers treat errors and declines alike: they
/// fall through to their statistical tier.
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    fn classify(&self, request: &ClassificationRequest) -> Result<OracleReply<Verdict>> {
        let _ = request;
        Ok(OracleReply::Unable("classification not supported".to_string()))
    }

    fn hierarchy(&self, request: &HierarchyRequest) -> Result<OracleReply<HierarchyVerdict>> {
        let _ = request;
        Ok(OracleReply::Unable("hierarchy not supported".to_string()))
    }

    fn strategy(&self, request: &StrategyRequest) -> Result<OracleReply<StrategyVerdict>> {
        let _ = request;
        Ok(OracleReply::Unable("strategy not supported".to_string()))
    }

    fn context(&self, request: &ContextRequest) -> Result<OracleReply<GlobalContext>> {
        let _ = request;
        Ok(OracleReply::Unable("context not supported".to_string()))
    }
}

/// Oracle for offline runs. Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOracle;

impl Oracle for NoOracle {
    fn name(&self) -> &str {
        "offline"
    }
}
