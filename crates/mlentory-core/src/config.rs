//! Layered run configuration: YAML file with typed defaults, secrets from the
//! environment (§6.4).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A secret-shaped config value: never inlined in YAML, always resolved from the
/// environment at startup (or a literal, for tests).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SecretReference {
    /// Resolve from the named environment variable.
    Env { var: String },
    /// A literal value, only meant for tests and local development.
    Literal { value: String },
}

impl SecretReference {
    /// Build an `Env` reference for `var`.
    #[must_use]
    pub fn env(var: impl Into<String>) -> Self {
        Self::Env { var: var.into() }
    }

    /// Resolve the secret's value, or a [`Error::Configuration`] if an `Env`
    /// reference names a variable that is not set.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Env { var } => std::env::var(var)
                .map_err(|_| Error::configuration(format!("missing required env var {var}"))),
            Self::Literal { value } => Ok(value.clone()),
        }
    }
}

/// General, platform-independent knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default worker-pool size for stages that do not override it.
    #[serde(default = "default_threads")]
    pub default_threads: usize,
    /// Root directory under which run folders are written.
    #[serde(default = "default_data_root")]
    pub data_root: String,
}

fn default_threads() -> usize {
    4
}

fn default_data_root() -> String {
    "./data".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_threads: default_threads(),
            data_root: default_data_root(),
        }
    }
}

/// Per-platform extraction knobs (§6.4). Every platform reads the whole struct;
/// unused fields for a given platform are simply ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub num_models: Option<usize>,
    #[serde(default)]
    pub num_instances: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_threads")]
    pub enrichment_threads: usize,
    #[serde(default)]
    pub update_recent: bool,
    #[serde(default = "default_base_model_iterations")]
    pub base_model_iterations: usize,
    #[serde(default)]
    pub enable_scraping: bool,
    #[serde(default)]
    pub models_file_path: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

fn default_base_model_iterations() -> usize {
    3
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            num_models: None,
            num_instances: None,
            offset: 0,
            threads: default_threads(),
            enrichment_threads: default_threads(),
            update_recent: false,
            base_model_iterations: default_base_model_iterations(),
            enable_scraping: false,
            models_file_path: None,
            base_url: None,
            parent_id: None,
        }
    }
}

/// The full, YAML-loaded run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub platforms: HashMap<String, PlatformConfig>,
    #[serde(default)]
    pub clean_neo4j_database: bool,
    #[serde(default)]
    pub clean_elasticsearch_index: bool,
}

impl RunConfig {
    /// Load a config from a YAML file, falling back to all-defaults on any field
    /// the file omits.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse a config from a YAML string.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yml::from_str(text)?)
    }

    /// Config knobs for `platform`, or the all-defaults config if unconfigured.
    #[must_use]
    pub fn platform(&self, platform: &str) -> PlatformConfig {
        self.platforms.get(platform).cloned().unwrap_or_default()
    }
}

/// Store credentials, resolved once at process start from the environment.
#[derive(Debug, Clone)]
pub struct StoreSecrets {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub elasticsearch_host: String,
}

impl StoreSecrets {
    /// Resolve all store secrets from the process environment.
    ///
    /// A missing required variable is a [`Error::Configuration`] error, fatal
    /// before any pipeline stage runs (§7).
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            neo4j_uri: SecretReference::env("MLENTORY_NEO4J_URI").resolve()?,
            neo4j_user: SecretReference::env("MLENTORY_NEO4J_USER").resolve()?,
            neo4j_password: SecretReference::env("MLENTORY_NEO4J_PASSWORD").resolve()?,
            elasticsearch_host: SecretReference::env("MLENTORY_ELASTICSEARCH_HOST").resolve()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_produces_defaults() {
        let cfg = RunConfig::from_yaml("").unwrap();
        assert_eq!(cfg.general.default_threads, 4);
        assert_eq!(cfg.general.data_root, "./data");
        assert!(!cfg.clean_neo4j_database);
    }

    #[test]
    fn platform_config_falls_back_to_defaults_when_unconfigured() {
        let cfg = RunConfig::from_yaml("general:\n  default_threads: 8\n").unwrap();
        let hf = cfg.platform("huggingface");
        assert_eq!(hf.threads, 4);
        assert_eq!(hf.base_model_iterations, 3);
    }

    #[test]
    fn platform_config_overrides_apply() {
        let yaml = r#"
platforms:
  huggingface:
    num_models: 100
    offset: 10
    threads: 6
    update_recent: true
"#;
        let cfg = RunConfig::from_yaml(yaml).unwrap();
        let hf = cfg.platform("huggingface");
        assert_eq!(hf.num_models, Some(100));
        assert_eq!(hf.offset, 10);
        assert_eq!(hf.threads, 6);
        assert!(hf.update_recent);
    }

    #[test]
    fn secret_reference_literal_resolves_without_environment() {
        let secret = SecretReference::Literal {
            value: "test-password".to_string(),
        };
        assert_eq!(secret.resolve().unwrap(), "test-password");
    }

    #[test]
    fn secret_reference_env_missing_is_configuration_error() {
        let secret = SecretReference::env("MLENTORY_DEFINITELY_UNSET_VAR_XYZ");
        let err = secret.resolve().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
