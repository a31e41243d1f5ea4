//! Error handling for the dashboard aggregation core
//!
//! Defines the error taxonomy for derived-metric computations and
//! establishes a unified Result type. Callers can distinguish input
//! rejections (non-retryable) from upstream store failures (retryable).

use thiserror::Error;

/// Failures raised by a record store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("io error")]
    Io(#[from] std::io::Error),

    #[error("malformed record data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Core error types for dashboard derivations
#[derive(Error, Debug)]
pub enum DashboardError {
    /// A required parameter was not supplied by the caller.
    #[error("missing required parameter: {0}")]
    MissingParam(&'static str),

    /// A parameter was supplied but its value is unusable.
    #[error("invalid parameter {name}: {value}")]
    InvalidParam { name: &'static str, value: String },

    /// The record-fetch collaborator failed.
    #[error("upstream store failure: {0}")]
    Upstream(#[from] StoreError),

    /// A cached value could not be serialized or restored.
    #[error("cache snapshot error: {0}")]
    Cache(#[from] serde_json::Error),
}

impl DashboardError {
    /// Upstream failures are transient and worth retrying; input
    /// rejections are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DashboardError::Upstream(_))
    }
}

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_formatting_is_readable() {
        let err = DashboardError::MissingParam("month");
        assert_eq!(err.to_string(), "missing required parameter: month");

        let err = DashboardError::InvalidParam {
            name: "page",
            value: "zero".to_string(),
        };
        assert_eq!(err.to_string(), "invalid parameter page: zero");
    }

    #[test]
    fn test_upstream_errors_are_retryable() {
        let err = DashboardError::from(StoreError::QueryFailed("timeout".to_string()));
        assert!(err.is_retryable());
        assert!(err.to_string().starts_with("upstream store failure"));

        assert!(!DashboardError::MissingParam("month").is_retryable());
    }

    #[test]
    fn test_store_error_variants() {
        let err = StoreError::UnknownCollection("dividendos".to_string());
        assert_eq!(err.to_string(), "unknown collection: dividendos");
    }
}
