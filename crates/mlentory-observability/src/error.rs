//! Error types for the observability crate.

use thiserror::Error;

/// Error type for logging and metrics operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// The `fmt`/`EnvFilter` subscriber could not be installed, e.g. because
    /// a global subscriber is already set.
    #[error("failed to initialize tracing subscriber: {0}")]
    Initialization(String),

    /// An invalid `EnvFilter` directive was supplied.
    #[error("invalid logging configuration: {0}")]
    Configuration(String),

    /// A Prometheus registry operation failed (duplicate registration,
    /// encoding failure, bind failure).
    #[error("metrics operation failed: {0}")]
    Metrics(String),
}

/// Result type for observability operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_display() {
        let err = Error::Initialization("already set".to_string());
        assert_eq!(err.to_string(), "failed to initialize tracing subscriber: already set");
    }

    #[test]
    fn configuration_error_display() {
        let err = Error::Configuration("bad directive".to_string());
        assert_eq!(err.to_string(), "invalid logging configuration: bad directive");
    }

    #[test]
    fn metrics_error_display() {
        let err = Error::Metrics("duplicate counter".to_string());
        assert_eq!(err.to_string(), "metrics operation failed: duplicate counter");
    }
}
