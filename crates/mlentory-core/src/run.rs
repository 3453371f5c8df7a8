//! Run identification and run-folder filesystem layout (§3.4, §6.1).

use crate::error::Result;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::PathBuf;

/// The stage tier a run artifact belongs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTier {
    Raw,
    Normalized,
    Rdf,
}

impl StageTier {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Raw => "1_raw",
            Self::Normalized => "2_normalized",
            Self::Rdf => "3_rdf",
        }
    }
}

/// A run identifier: timestamp + short random suffix, so two runs started in the
/// same second are still distinguishable (§3.4, GLOSSARY "Run").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(String);

impl RunId {
    /// Mint a new run id from `started_at` and a caller-supplied random suffix.
    ///
    /// The suffix is injected rather than generated here so callers in tests can
    /// pass a fixed value; [`RunId::generate`] is the normal entry point.
    #[must_use]
    pub fn new(started_at: DateTime<Utc>, suffix: &str) -> Self {
        Self(format!("{}_{suffix}", started_at.format("%Y%m%dT%H%M%S")))
    }

    /// Mint a new run id using the current time and a fresh random suffix.
    #[must_use]
    pub fn generate(started_at: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(6)
            .map(char::from)
            .collect();
        Self::new(started_at, &suffix.to_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves the directory a stage writes its artifacts into, and creates it lazily.
///
/// A run folder is created once by the first stage that needs it and never mutated
/// after the owning stage exits (§3.4); downstream stages only ever read from
/// directories whose path they were handed as another stage's output.
#[derive(Debug, Clone)]
pub struct RunPaths {
    data_root: PathBuf,
    platform: String,
    run_id: RunId,
}

impl RunPaths {
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>, platform: impl Into<String>, run_id: RunId) -> Self {
        Self {
            data_root: data_root.into(),
            platform: platform.into(),
            run_id,
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Directory for a given stage tier, e.g. `<data-root>/1_raw/huggingface/<run-id>/`.
    #[must_use]
    pub fn tier_dir(&self, tier: StageTier) -> PathBuf {
        self.data_root
            .join(tier.dir_name())
            .join(&self.platform)
            .join(self.run_id.as_str())
    }

    /// Path to a named artifact file within a tier, creating the tier directory
    /// (and any missing parents) if it does not already exist.
    pub fn artifact_path(&self, tier: StageTier, file_name: &str) -> Result<PathBuf> {
        let dir = self.tier_dir(tier);
        std::fs::create_dir_all(&dir)?;
        Ok(dir.join(file_name))
    }

    /// The shared `refs/` directory (curated CSVs, task catalogs) — not run-scoped.
    #[must_use]
    pub fn refs_dir(&self) -> PathBuf {
        self.data_root.join("refs")
    }
}
