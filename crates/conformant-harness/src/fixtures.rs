//! Fixture loading and management.
//!
//! A fixture file is a JSON array of groups:
//!
//! ```json
//! [{"description": "...", "schema": {...},
//!   "tests": [{"description": "...", "data": ..., "valid": true,
//!              "tags": ["..."], "assertion": "..."}]}]
//! ```
//!
//! Parsing is tolerant: a malformed group or case is skipped on its own and
//! the rest of the file survives. Indices always reflect the position in the
//! file so case ids do not shift when a sibling is malformed.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::source::{SourceError, TestSource};
use crate::value::FixtureValue;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Decode(#[from] SourceError),
}

/// A single fixture case.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureCase {
    /// Position within the group's `tests` array.
    pub index: usize,
    pub description: String,
    pub data: FixtureValue,
    /// Expected validator outcome.
    pub expected: bool,
    pub tags: Vec<String>,
    /// Name of a registered custom assertion.
    pub assertion: Option<String>,
}

/// Cases sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureGroup {
    /// Position within the file's top-level array.
    pub index: usize,
    pub description: String,
    /// Schema passed to the validator; `{}` when the fixture omits it.
    pub schema: FixtureValue,
    pub cases: Vec<FixtureCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureFile {
    pub path: PathBuf,
    pub groups: Vec<FixtureGroup>,
}

impl FixtureFile {
    /// Read and decode a fixture file through the source's JSON decoder.
    pub fn load(source: &dyn TestSource, path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path)?;
        let root = source.decode_json(&text)?;
        Ok(Self::from_value(path, &root))
    }

    /// Interpret a decoded document, skipping whatever does not fit the shape.
    #[must_use]
    pub fn from_value(path: &Path, root: &FixtureValue) -> Self {
        let Some(raw_groups) = root.as_list() else {
            tracing::warn!(
                path = %path.display(),
                kind = root.kind(),
                "fixture root is not an array; skipping file"
            );
            return Self {
                path: path.to_path_buf(),
                groups: Vec::new(),
            };
        };

        let groups = raw_groups
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| parse_group(path, index, raw))
            .collect();

        Self {
            path: path.to_path_buf(),
            groups,
        }
    }

    /// Number of cases, without running anything.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.groups.iter().map(|g| g.cases.len()).sum()
    }

    /// File stem used in case ids.
    #[must_use]
    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn parse_group(path: &Path, index: usize, raw: &FixtureValue) -> Option<FixtureGroup> {
    let Some(tests) = raw.get("tests").and_then(FixtureValue::as_list) else {
        tracing::warn!(path = %path.display(), group = index, "group has no `tests` array; skipping");
        return None;
    };

    let cases = tests
        .iter()
        .enumerate()
        .filter_map(|(case_index, raw_case)| {
            let parsed = parse_case(case_index, raw_case);
            if parsed.is_none() {
                tracing::warn!(
                    path = %path.display(),
                    group = index,
                    case = case_index,
                    "case lacks `data` or boolean `valid`; skipping"
                );
            }
            parsed
        })
        .collect();

    Some(FixtureGroup {
        index,
        description: string_field(raw, "description"),
        schema: raw
            .get("schema")
            .cloned()
            .unwrap_or_else(|| FixtureValue::Map(Vec::new())),
        cases,
    })
}

fn parse_case(index: usize, raw: &FixtureValue) -> Option<FixtureCase> {
    let data = raw.get("data")?.clone();
    let expected = raw.get("valid")?.as_bool()?;
    let tags = raw
        .get("tags")
        .and_then(FixtureValue::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(FixtureValue::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let assertion = raw
        .get("assertion")
        .and_then(FixtureValue::as_str)
        .map(str::to_string);

    Some(FixtureCase {
        index,
        description: string_field(raw, "description"),
        data,
        expected,
        tags,
        assertion,
    })
}

fn string_field(raw: &FixtureValue, key: &str) -> String {
    raw.get(key)
        .and_then(FixtureValue::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
