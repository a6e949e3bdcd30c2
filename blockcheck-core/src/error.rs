//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

/// Errors raised at the boundary of the probe pipeline.
///
/// Probe-level failures never show up here: they are absorbed into the
/// [`Report`](crate::Report) as typed outcomes. Only caller input and
/// configuration problems, plus an expired outer deadline, are errors.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum BlockCheckError {
    /// Invalid caller input (e.g. blank domain)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid probe configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The embedding layer's deadline expired before the run finished
    #[error("Probe run exceeded deadline of {0:.2}s")]
    DeadlineExceeded(f64),
}

impl BlockCheckError {
    /// Whether the error stems from the caller (bad input), used to pick a log level.
    ///
    /// `true` should be logged at `warn`, `false` at `error`.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::ValidationError(_) => true,
            Self::ConfigError(_) | Self::DeadlineExceeded(_) => false,
        }
    }
}

/// Result type alias for blockcheck operations
pub type BlockCheckResult<T> = std::result::Result<T, BlockCheckError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_with_code_tag() {
        let err = BlockCheckError::ValidationError("Domain name is required".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "ValidationError");
        assert_eq!(json["details"], "Domain name is required");
    }

    #[test]
    fn test_is_expected() {
        assert!(BlockCheckError::ValidationError(String::new()).is_expected());
        assert!(!BlockCheckError::ConfigError(String::new()).is_expected());
        assert!(!BlockCheckError::DeadlineExceeded(1.0).is_expected());
    }

    #[test]
    fn test_deadline_display() {
        let err = BlockCheckError::DeadlineExceeded(2.5);
        assert_eq!(err.to_string(), "Probe run exceeded deadline of 2.50s");
    }
}
