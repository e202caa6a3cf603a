//! Pipeline context shared by every stage of a document run.
//!
//! The [`PipelineContext`] bundles the oracle, the [`ProcessingOptions`] and
//! the reference date that anchors generated dates. It is built once per run
//! and only read afterwards, so sheet workers share it by reference.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use qfill_oracle::{NoOracle, Oracle, ResilientOracle};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::warn;

pub use qfill_model::{OracleSettings, ProcessingOptions};

/// Centralized context for the questionnaire pipeline.
pub struct PipelineContext {
    oracle: Arc<dyn Oracle>,
    /// Processing options (hierarchy oracle, overrides, seeding, parallelism).
    pub options: ProcessingOptions,
    /// Anchor for generated dates.
    pub reference_date: NaiveDate,
}

impl PipelineContext {
    /// Offline context: every oracle question is declined.
    pub fn new(options: ProcessingOptions) -> Self {
        Self {
            oracle: Arc::new(NoOracle),
            options,
            reference_date: Local::now().date_naive(),
        }
    }

    /// Route oracle calls through `oracle`, wrapped with the timeout, retry
    /// and concurrency limits of `options.oracle`.
    #[must_use]
    pub fn with_oracle<O: Oracle + 'static>(mut self, oracle: O) -> Self {
        self.oracle = Arc::new(ResilientOracle::new(oracle, self.options.oracle.clone()));
        self
    }

    #[must_use]
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = date;
        self
    }

    pub fn oracle(&self) -> &dyn Oracle {
        self.oracle.as_ref()
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Map `f` over per-sheet work items on a pool of
    /// `max_parallel_sheets` workers. Output order matches input order.
    pub(crate) fn map_sheets<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        let workers = self.options.max_parallel_sheets;
        if workers <= 1 || items.len() <= 1 {
            return items.into_iter().map(f).collect();
        }
        match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(|| items.into_par_iter().map(f).collect()),
            Err(error) => {
                warn!(%error, workers, "Sheet worker pool unavailable; processing sheets serially");
                items.into_iter().map(f).collect()
            }
        }
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(ProcessingOptions::default())
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("oracle", &self.oracle.name())
            .field("options", &self.options)
            .field("reference_date", &self.reference_date)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_sheets_keeps_input_order() {
        let ctx = PipelineContext::new(ProcessingOptions::default().with_max_parallel_sheets(3));
        let out = ctx.map_sheets((0..40).collect(), |i: usize| i * 2);
        assert_eq!(out, (0..40).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn default_context_is_offline() {
        let ctx = PipelineContext::default();
        assert_eq!(ctx.oracle_name(), NoOracle.name());
    }
}
