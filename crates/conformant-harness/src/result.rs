//! Per-case results and the suite aggregate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of executing a single fixture case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// `<source>::<file stem>::<group index>::<case index>`; stable across runs.
    pub id: String,
    /// Fixture file the case came from.
    pub file: PathBuf,
    /// Group description.
    pub group: String,
    /// Case description.
    pub description: String,
    /// Outcome recorded in the fixture.
    pub expected: bool,
    /// Outcome reported by the validator (`false` when it errored).
    pub actual: bool,
    pub passed: bool,
    /// Validator error message, if validation itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Assertion failure message for mismatches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration: Duration,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CaseResult {
    /// `"<group> - <description>"`, the string name filters match against.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} - {}", self.group, self.description)
    }
}

/// Aggregate report for one source run.
///
/// Counts are always computed from `results`; nothing is cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    pub name: String,
    pub results: Vec<CaseResult>,
    /// Wall-clock time of the whole run.
    pub duration: Duration,
}

impl Suite {
    #[must_use]
    pub fn new(name: impl Into<String>, results: Vec<CaseResult>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            results,
            duration,
        }
    }

    #[must_use]
    pub fn total_tests(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn passed_tests(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    #[must_use]
    pub fn failed_tests(&self) -> usize {
        self.total_tests() - self.passed_tests()
    }

    /// Percentage in `[0, 100]`; an empty suite counts as fully passing.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        let total = self.total_tests();
        if total == 0 {
            return 100.0;
        }
        self.passed_tests() as f64 / total as f64 * 100.0
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
