//! Deterministic oracle driven by closures, for tests and dry runs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use qfill_model::GlobalContext;

use crate::error::Result;
use crate::oracle::{Oracle, OracleReply};
use crate::request::{
    ClassificationRequest, ContextRequest, HierarchyRequest, HierarchyVerdict, StrategyRequest,
    StrategyVerdict, Verdict,
};

type Handler<Req, T> = Box<dyn Fn(&Req) -> Result<OracleReply<T>> + Send + Sync>;

/// Oracle whose answers are supplied per operation. Operations without a
/// handler decline. Every call is counted.
#[derive(Default)]
pub struct ScriptedOracle {
    classify: Option<Handler<ClassificationRequest, Verdict>>,
    hierarchy: Option<Handler<HierarchyRequest, HierarchyVerdict>>,
    strategy: Option<Handler<StrategyRequest, StrategyVerdict>>,
    context: Option<Handler<ContextRequest, GlobalContext>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_classify<F>(mut self, f: F) -> Self
    where
        F: Fn(&ClassificationRequest) -> Result<OracleReply<Verdict>> + Send + Sync + 'static,
    {
        self.classify = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_hierarchy<F>(mut self, f: F) -> Self
    where
        F: Fn(&HierarchyRequest) -> Result<OracleReply<HierarchyVerdict>> + Send + Sync + 'static,
    {
        self.hierarchy = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_strategy<F>(mut self, f: F) -> Self
    where
        F: Fn(&StrategyRequest) -> Result<OracleReply<StrategyVerdict>> + Send + Sync + 'static,
    {
        self.strategy = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_context<F>(mut self, f: F) -> Self
    where
        F: Fn(&ContextRequest) -> Result<OracleReply<GlobalContext>> + Send + Sync + 'static,
    {
        self.context = Some(Box::new(f));
        self
    }

    /// Sleep before every answer; used to provoke timeouts.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn run<Req, T>(
        &self,
        handler: Option<&Handler<Req, T>>,
        request: &Req,
    ) -> Result<OracleReply<T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        match handler {
            Some(handler) => handler(request),
            None => Ok(OracleReply::Unable("not scripted".to_string())),
        }
    }
}

impl Oracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    fn classify(&self, request: &ClassificationRequest) -> Result<OracleReply<Verdict>> {
        self.run(self.classify.as_ref(), request)
    }

    fn hierarchy(&self, request: &HierarchyRequest) -> Result<OracleReply<HierarchyVerdict>> {
        self.run(self.hierarchy.as_ref(), request)
    }

    fn strategy(&self, request: &StrategyRequest) -> Result<OracleReply<StrategyVerdict>> {
        self.run(self.strategy.as_ref(), request)
    }

    fn context(&self, request: &ContextRequest) -> Result<OracleReply<GlobalContext>> {
        self.run(self.context.as_ref(), request)
    }
}
