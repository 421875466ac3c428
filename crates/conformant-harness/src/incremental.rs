//! Changed-file selection across runs.
//!
//! The selector keeps a `{absolute path -> mtime (unix seconds)}` snapshot in
//! an injected [`MtimeStore`]. Any doubt about the snapshot (missing,
//! unreadable, or a diff that comes out empty) selects every file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;

pub type MtimeSnapshot = BTreeMap<String, u64>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persistence port for the mtime snapshot.
pub trait MtimeStore {
    /// `None` when there is no usable snapshot (absent or corrupt).
    fn load(&self) -> Option<MtimeSnapshot>;

    fn save(&self, snapshot: &MtimeSnapshot) -> Result<(), CacheError>;
}

/// Flat JSON file store. Read fully, written fully, no locking.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MtimeStore for JsonFileStore {
    fn load(&self) -> Option<MtimeSnapshot> {
        let body = match std::fs::read_to_string(&self.path) {
            Ok(body) => body,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "incremental cache unreadable");
                return None;
            }
        };
        match serde_json::from_str(&body) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "incremental cache corrupt");
                None
            }
        }
    }

    fn save(&self, snapshot: &MtimeSnapshot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, body)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct IncrementalSelector<S> {
    store: S,
}

impl<S: MtimeStore> IncrementalSelector<S> {
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Files that are new or whose mtime moved since the last saved snapshot.
    ///
    /// Returns the full input when there is no usable snapshot or when
    /// nothing appears to have changed.
    #[must_use]
    pub fn filter_changed_files(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        let Some(cached) = self.store.load() else {
            tracing::debug!("no incremental cache; selecting all files");
            return files.to_vec();
        };

        let changed: Vec<PathBuf> = files
            .iter()
            .filter(|path| match cached.get(&cache_key(path)) {
                None => true,
                Some(&seen) => modified_secs(path) != Some(seen),
            })
            .cloned()
            .collect();

        if changed.is_empty() {
            tracing::debug!(files = files.len(), "no changes detected; selecting all files");
            return files.to_vec();
        }
        tracing::debug!(changed = changed.len(), of = files.len(), "incremental selection");
        changed
    }

    /// Record current mtimes for `files`. Files without a readable mtime
    /// are left out.
    pub fn save_cache(&self, files: &[PathBuf]) -> Result<(), CacheError> {
        let snapshot: MtimeSnapshot = files
            .iter()
            .filter_map(|path| modified_secs(path).map(|secs| (cache_key(path), secs)))
            .collect();
        self.store.save(&snapshot)
    }
}

fn cache_key(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn modified_secs(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(modified.duration_since(UNIX_EPOCH).ok()?.as_secs())
}
