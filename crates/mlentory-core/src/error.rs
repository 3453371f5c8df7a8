//! Workspace-wide error type for the ingestion engine.
//!
//! Connector crates (Neo4j, Elasticsearch, arXiv, Wikipedia, ...) define their own
//! narrow error enum and convert into [`Error`] at the crate boundary.

use thiserror::Error;

/// Result alias used throughout the core crate and its connectors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error kinds named in the ingestion engine's error-handling design.
#[derive(Debug, Error)]
pub enum Error {
    /// Required env/config missing or malformed. Fatal at process start.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// HTTP timeout, 5xx, connection reset, exceeded the client's own retry budget.
    #[error("transient network error calling {service}: {message}")]
    Transient {
        /// Name of the remote service that failed.
        service: String,
        /// Human-readable detail.
        message: String,
    },

    /// Schema violation during normalization of a single record.
    #[error("validation error for record {record_id}: {message}")]
    Validation {
        /// Id of the offending record.
        record_id: String,
        /// Human-readable detail.
        message: String,
    },

    /// A stage produced zero surviving records when at least one was expected.
    #[error("stage {stage} produced empty output")]
    EmptyOutput {
        /// Name of the stage that emptied out.
        stage: String,
    },

    /// The triple store or document store could not be reached at load/index time.
    #[error("store {store} unavailable: {message}")]
    StoreUnavailable {
        /// Name of the backing store.
        store: String,
        /// Human-readable detail.
        message: String,
    },

    /// Serialization/deserialization failure (JSON, YAML).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Escape hatch for conditions not covered by a more specific variant.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a [`Error::Configuration`] error from any displayable value.
    pub fn configuration(msg: impl std::fmt::Display) -> Self {
        Self::Configuration(msg.to_string())
    }

    /// Build a [`Error::Transient`] error.
    pub fn transient(service: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Transient {
            service: service.into(),
            message: msg.to_string(),
        }
    }

    /// Build a [`Error::Validation`] error.
    pub fn validation(record_id: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::Validation {
            record_id: record_id.into(),
            message: msg.to_string(),
        }
    }

    /// Build a [`Error::StoreUnavailable`] error.
    pub fn store_unavailable(store: impl Into<String>, msg: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            store: store.into(),
            message: msg.to_string(),
        }
    }

    /// Build an [`Error::Other`] error from any displayable value.
    pub fn other(msg: impl std::fmt::Display) -> Self {
        Self::Other(msg.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_yml::Error> for Error {
    fn from(e: serde_yml::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_formats_message() {
        let err = Error::configuration("missing NEO4J_URI");
        assert_eq!(err.to_string(), "configuration error: missing NEO4J_URI");
    }

    #[test]
    fn transient_error_carries_service_name() {
        let err = Error::transient("arxiv", "timed out after 3 retries");
        match err {
            Error::Transient { service, .. } => assert_eq!(service, "arxiv"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn empty_output_names_stage() {
        let err = Error::EmptyOutput {
            stage: "normalize.mlmodel".to_string(),
        };
        assert!(err.to_string().contains("normalize.mlmodel"));
    }
}
