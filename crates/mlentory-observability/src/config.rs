//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Output format for the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Compact,
    /// Newline-delimited JSON, for log aggregators.
    Json,
}

/// Configuration for [`crate::init_tracing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Reported as the `service` field on every span; also the default
    /// `EnvFilter` directive when `env_filter` is `None`.
    pub service_name: String,

    /// Explicit `tracing_subscriber::EnvFilter` directive, e.g.
    /// `"mlentory=debug,info"`. Falls back to the `RUST_LOG` environment
    /// variable, then to `"info"`, when unset.
    pub env_filter: Option<String>,

    /// Output format.
    pub format: LogFormat,
}

impl LoggingConfig {
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), env_filter: None, format: LogFormat::Compact }
    }

    #[must_use]
    pub fn with_env_filter(mut self, directive: impl Into<String>) -> Self {
        self.env_filter = Some(directive.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("mlentory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_compact_format_and_no_explicit_filter() {
        let config = LoggingConfig::default();
        assert_eq!(config.service_name, "mlentory");
        assert_eq!(config.env_filter, None);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn builder_overrides_filter_and_format() {
        let config = LoggingConfig::new("mlentory-cli").with_env_filter("mlentory=debug").with_format(LogFormat::Json);
        assert_eq!(config.service_name, "mlentory-cli");
        assert_eq!(config.env_filter.as_deref(), Some("mlentory=debug"));
        assert_eq!(config.format, LogFormat::Json);
    }
}
