//! Configuration options for questionnaire processing.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategy::Distribution;

/// Limits applied to every oracle call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleSettings {
    /// Per-call timeout.
    pub timeout: Duration,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `base * 2^(n-1)`.
    pub backoff_base: Duration,
    /// Maximum number of calls in flight across all sheets.
    pub max_concurrent: usize,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            max_concurrent: 4,
        }
    }
}

impl OracleSettings {
    /// No waiting between retries; used by tests and offline runs.
    pub fn immediate() -> Self {
        Self {
            backoff_base: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }
}

/// Options controlling questionnaire processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Ask the oracle for row levels before falling back to marker rules.
    pub hierarchy_oracle: bool,

    /// Name of the sheet to treat as the content sheet, bypassing detection.
    pub content_sheet: Option<String>,

    /// Fill columns even when their generator allows blank output.
    pub force_non_empty: bool,

    /// Caller supplied response distribution; wins over oracle and defaults.
    pub distribution: Option<Distribution>,

    /// Mixed into every row seed so separate runs can differ on purpose.
    pub seed_salt: u64,

    /// Question sheets processed concurrently.
    pub max_parallel_sheets: usize,

    pub oracle: OracleSettings,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            hierarchy_oracle: true,
            content_sheet: None,
            force_non_empty: false,
            distribution: None,
            seed_salt: 0,
            max_parallel_sheets: 4,
            oracle: OracleSettings::default(),
        }
    }
}

impl ProcessingOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hierarchy_oracle(mut self, enable: bool) -> Self {
        self.hierarchy_oracle = enable;
        self
    }

    #[must_use]
    pub fn with_content_sheet(mut self, sheet: Option<String>) -> Self {
        self.content_sheet = sheet;
        self
    }

    #[must_use]
    pub fn with_force_non_empty(mut self, enable: bool) -> Self {
        self.force_non_empty = enable;
        self
    }

    #[must_use]
    pub fn with_distribution(mut self, distribution: Option<Distribution>) -> Self {
        self.distribution = distribution;
        self
    }

    #[must_use]
    pub fn with_seed_salt(mut self, salt: u64) -> Self {
        self.seed_salt = salt;
        self
    }

    #[must_use]
    pub fn with_max_parallel_sheets(mut self, workers: usize) -> Self {
        self.max_parallel_sheets = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: OracleSettings) -> Self {
        self.oracle = oracle;
        self
    }
}
