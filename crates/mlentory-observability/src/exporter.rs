//! `tracing_subscriber` initialization.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{Error, Result};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install a global `tracing` subscriber: an `EnvFilter` layer (explicit
/// directive, else `RUST_LOG`, else `"info"`) plus a `fmt` layer in the
/// requested format.
///
/// # Example
///
/// ```rust,no_run
/// use mlentory_observability::{LoggingConfig, init_tracing};
///
/// init_tracing(LoggingConfig::new("mlentory-cli")).unwrap();
/// ```
pub fn init_tracing(config: LoggingConfig) -> Result<()> {
    let env_filter = config
        .env_filter
        .as_deref()
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.format {
        LogFormat::Compact => registry.with(tracing_subscriber::fmt::layer().compact()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };
    result.map_err(|e| Error::Initialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_does_not_panic_when_already_initialized() {
        let _ = init_tracing(LoggingConfig::new("test-service"));
        // A second call fails to install (global subscriber already set) but
        // must return an error rather than panic.
        let result = init_tracing(LoggingConfig::new("test-service"));
        assert!(result.is_err());
    }
}
