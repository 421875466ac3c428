//! Per-file and per-case execution.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::assertion::AssertionRegistry;
use crate::filter::CaseFilter;
use crate::fixtures::{FixtureCase, FixtureFile, FixtureGroup};
use crate::result::CaseResult;
use crate::source::{TestSource, ValidationOutcome};
use crate::value::FixtureValue;

/// Receives each result as soon as its case completes.
pub trait ProgressSink {
    fn advance(&mut self, result: &CaseResult);
}

impl<F: FnMut(&CaseResult)> ProgressSink for F {
    fn advance(&mut self, result: &CaseResult) {
        self(result);
    }
}

/// Stable case id: `<source>::<file stem>::<group index>::<case index>`.
///
/// The stem drops the directory, so `a/types.json` and `b/types.json` yield
/// the same ids; discovery warns when that happens. `CaseResult::file`
/// tells them apart.
#[must_use]
pub fn case_id(source: &str, stem: &str, group: usize, case: usize) -> String {
    format!("{source}::{stem}::{group}::{case}")
}

/// Executes fixture cases against a source.
///
/// Cloning is cheap; the filter and registry are shared immutably.
#[derive(Debug, Clone, Default)]
pub struct CaseExecutor {
    filter: CaseFilter,
    assertions: Arc<AssertionRegistry>,
}

impl CaseExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, filter: CaseFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_assertions(mut self, assertions: Arc<AssertionRegistry>) -> Self {
        self.assertions = assertions;
        self
    }

    #[must_use]
    pub fn filter(&self) -> &CaseFilter {
        &self.filter
    }

    /// Load one file and execute every case that survives the filter.
    ///
    /// An unreadable or undecodable file produces no results, and so does a
    /// decoder that panics on it.
    pub fn execute_file(
        &self,
        source: &dyn TestSource,
        path: &Path,
        progress: Option<&mut dyn ProgressSink>,
    ) -> Vec<CaseResult> {
        match load_guarded(source, path) {
            Some(fixture) => self.execute_fixture(source, &fixture, progress),
            None => Vec::new(),
        }
    }

    pub fn execute_fixture(
        &self,
        source: &dyn TestSource,
        fixture: &FixtureFile,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Vec<CaseResult> {
        let stem = fixture.stem();
        let mut results = Vec::with_capacity(fixture.case_count());
        for group in &fixture.groups {
            for case in &group.cases {
                if !self
                    .filter
                    .includes_case(&group.description, &case.description, &case.tags)
                {
                    continue;
                }
                let id = case_id(source.name(), &stem, group.index, case.index);
                let result = self.execute_case(source, id, &fixture.path, group, case);
                if let Some(sink) = progress.as_deref_mut() {
                    sink.advance(&result);
                }
                results.push(result);
            }
        }
        results
    }

    /// Run one case and judge it.
    #[must_use]
    pub fn execute_case(
        &self,
        source: &dyn TestSource,
        id: String,
        file: &Path,
        group: &FixtureGroup,
        case: &FixtureCase,
    ) -> CaseResult {
        let start = Instant::now();
        let outcome = validate_guarded(source, &case.data, &group.schema);

        let (actual, passed, error, message) = match outcome {
            Ok(outcome) => {
                let actual = outcome.is_valid();
                let assertion = self.assertions.resolve(case.assertion.as_deref());
                let passed = assertion.assert(&case.data, case.expected, actual);
                let message =
                    (!passed).then(|| assertion.failure_message(&case.data, case.expected, actual));
                (actual, passed, None, message)
            }
            Err(err) => (false, false, Some(err), None),
        };

        CaseResult {
            id,
            file: file.to_path_buf(),
            group: group.description.clone(),
            description: case.description.clone(),
            expected: case.expected,
            actual,
            passed,
            error,
            message,
            duration: start.elapsed(),
            tags: case.tags.clone(),
        }
    }

    /// Parse-only count of the cases that would run for `path`.
    #[must_use]
    pub fn count_file(&self, source: &dyn TestSource, path: &Path) -> usize {
        let Some(fixture) = load_guarded(source, path) else {
            return 0;
        };
        fixture
            .groups
            .iter()
            .flat_map(|g| g.cases.iter().map(move |c| (g, c)))
            .filter(|(g, c)| self.filter.includes_case(&g.description, &c.description, &c.tags))
            .count()
    }
}

/// Load a fixture through the source's decoder, logging and discarding
/// load errors and decoder panics.
fn load_guarded(source: &dyn TestSource, path: &Path) -> Option<FixtureFile> {
    match catch_unwind(AssertUnwindSafe(|| FixtureFile::load(source, path))) {
        Ok(Ok(fixture)) => Some(fixture),
        Ok(Err(err)) => {
            tracing::warn!(path = %path.display(), error = %err, "skipping unloadable fixture");
            None
        }
        Err(payload) => {
            tracing::warn!(
                path = %path.display(),
                panic = %panic_message(payload.as_ref()),
                "decoder panicked; skipping fixture"
            );
            None
        }
    }
}

/// Invoke the validator, turning both errors and panics into a message.
pub(crate) fn validate_guarded(
    source: &dyn TestSource,
    data: &FixtureValue,
    schema: &FixtureValue,
) -> Result<ValidationOutcome, String> {
    match catch_unwind(AssertUnwindSafe(|| source.validate(data, schema))) {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("validator panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("non-string panic payload")
    }
}
