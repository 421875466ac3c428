//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::filter::FilterError;
use crate::incremental::CacheError;
use crate::source::SourceError;

/// Everything that can escape a harness run.
///
/// Per-case and per-worker failures never show up here; they are folded
/// into the suite as failed or missing results.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("incremental cache: {0}")]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("report encoding: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
