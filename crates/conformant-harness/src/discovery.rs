//! Fixture file discovery.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::filter::CaseFilter;
use crate::fixtures::file_stem;
use crate::source::TestSource;

/// Default fixture extension.
pub const DEFAULT_EXTENSION: &str = "json";

/// Recursively collect fixture files under the source's test directory.
///
/// Keeps regular files with the given extension that pass both the source's
/// own predicate and the filter's path glob. A missing directory yields an
/// empty list. The result is sorted by path so ids and batch assignment are
/// reproducible.
#[must_use]
pub fn collect_test_files(
    source: &dyn TestSource,
    filter: &CaseFilter,
    extension: &str,
) -> Vec<PathBuf> {
    let root = source.test_directory();
    if !root.is_dir() {
        tracing::debug!(root = %root.display(), "test directory missing; nothing to discover");
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| has_extension(path, extension))
        .filter(|path| is_utf8(path))
        .filter(|path| source.should_include_file(path))
        .filter(|path| filter.includes_file(path, root))
        .collect();

    files.sort();
    warn_on_shared_stems(&files);
    tracing::debug!(source = source.name(), count = files.len(), "discovered fixture files");
    files
}

/// Results carry their file path through JSON reports and worker outputs,
/// which need UTF-8. Such files are dropped here so every runner sees the
/// same list.
fn is_utf8(path: &Path) -> bool {
    if path.to_str().is_some() {
        return true;
    }
    tracing::warn!(path = %path.display(), "skipping fixture with a non-UTF-8 path");
    false
}

/// Case ids are keyed on the file stem, so same-named files in different
/// directories share an id prefix.
fn warn_on_shared_stems(files: &[PathBuf]) {
    let mut seen: BTreeMap<String, &Path> = BTreeMap::new();
    for path in files {
        let stem = file_stem(path);
        if let Some(first) = seen.insert(stem.clone(), path) {
            tracing::warn!(
                stem = %stem,
                first = %first.display(),
                second = %path.display(),
                "fixture files share a stem; their case ids will collide"
            );
        }
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
