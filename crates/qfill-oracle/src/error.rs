//! Error types for oracle calls.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to an oracle.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum OracleError {
    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// The call did not finish in time.
    #[error("oracle call timed out after {after:?}")]
    Timeout { after: Duration },

    /// Remote rate limit exceeded.
    #[error("oracle rate limit exceeded, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Non-success HTTP status.
    #[error("oracle returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Reply could not be understood.
    #[error("malformed oracle reply: {0}")]
    Malformed(String),

    /// Oracle is misconfigured (bad endpoint, missing credentials).
    #[error("oracle configuration error: {0}")]
    Config(String),
}

impl OracleError {
    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Malformed(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Config(_) => false,
        }
    }
}

impl From<reqwest::Error> for OracleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result type alias for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(OracleError::Network("reset".to_string()).is_retryable());
        assert!(
            OracleError::Timeout {
                after: Duration::from_secs(1)
            }
            .is_retryable()
        );
        assert!(
            OracleError::Status {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !OracleError::Status {
                status: 401,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!OracleError::Config("no endpoint".to_string()).is_retryable());
    }
}
