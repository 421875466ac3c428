//! Harness configuration.
//!
//! Settings come from an optional JSON file, then environment overrides,
//! then whatever the caller (usually the CLI) sets explicitly.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::discovery::DEFAULT_EXTENSION;
use crate::filter::{CaseFilter, FilterError};

pub const ENV_WORKERS: &str = "CONFORMANT_WORKERS";
pub const ENV_CACHE: &str = "CONFORMANT_CACHE";
pub const ENV_INCREMENTAL: &str = "CONFORMANT_INCREMENTAL";
pub const ENV_FUZZ_SEED: &str = "CONFORMANT_FUZZ_SEED";

pub const DEFAULT_CACHE_PATH: &str = ".conformant-cache.json";
pub const DEFAULT_FUZZ_ITERATIONS: usize = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Filter patterns as written in config; compiled by [`HarnessConfig::build_filter`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub name: Option<String>,
    pub path: Option<String>,
    pub exclude: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzConfig {
    pub iterations: usize,
    pub seed: Option<u64>,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_FUZZ_ITERATIONS,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub workers: usize,
    pub extension: String,
    pub filter: FilterConfig,
    pub incremental: bool,
    pub cache_path: PathBuf,
    pub fuzz: FuzzConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            extension: DEFAULT_EXTENSION.to_string(),
            filter: FilterConfig::default(),
            incremental: false,
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            fuzz: FuzzConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load a JSON config file. Absent keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&body).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `CONFORMANT_*` variables from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay `CONFORMANT_*` variables read through `lookup`.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_WORKERS) {
            match parse_count_loose(&raw) {
                Some(workers) => self.workers = workers,
                None => tracing::warn!(var = ENV_WORKERS, value = %raw, "ignoring unparseable value"),
            }
        }
        if let Some(raw) = lookup(ENV_CACHE)
            && !raw.trim().is_empty()
        {
            self.cache_path = PathBuf::from(raw.trim());
        }
        if let Some(raw) = lookup(ENV_INCREMENTAL) {
            match parse_bool_loose(&raw) {
                Some(flag) => self.incremental = flag,
                None => {
                    tracing::warn!(var = ENV_INCREMENTAL, value = %raw, "ignoring unparseable value");
                }
            }
        }
        if let Some(raw) = lookup(ENV_FUZZ_SEED) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => self.fuzz.seed = Some(seed),
                Err(_) => tracing::warn!(var = ENV_FUZZ_SEED, value = %raw, "ignoring unparseable value"),
            }
        }
        self
    }

    /// Compile the configured filter patterns.
    pub fn build_filter(&self) -> Result<CaseFilter, ConfigError> {
        let mut filter = CaseFilter::new();
        if let Some(pattern) = &self.filter.name {
            filter = filter.with_name(pattern)?;
        }
        if let Some(pattern) = &self.filter.path {
            filter = filter.with_path(pattern)?;
        }
        if let Some(pattern) = &self.filter.exclude {
            filter = filter.with_exclude(pattern)?;
        }
        if let Some(tag) = &self.filter.tag {
            filter = filter.with_tag(tag.clone());
        }
        Ok(filter)
    }
}

/// Parse a boolean flag (case-insensitive).
#[must_use]
pub fn parse_bool_loose(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" | "" => Some(false),
        _ => None,
    }
}

/// Parse a positive count; zero is raised to one.
#[must_use]
pub fn parse_count_loose(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok().map(|n| n.max(1))
}
