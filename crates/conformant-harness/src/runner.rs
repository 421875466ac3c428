//! Test execution engine.

use std::path::PathBuf;
use std::time::Instant;

use crate::discovery::{self, DEFAULT_EXTENSION};
use crate::executor::{CaseExecutor, ProgressSink};
use crate::result::Suite;
use crate::source::TestSource;

/// Runs fixture files one after another, in sorted path order.
#[derive(Debug, Clone)]
pub struct SequentialRunner {
    executor: CaseExecutor,
    extension: String,
}

impl Default for SequentialRunner {
    fn default() -> Self {
        Self::new(CaseExecutor::new())
    }
}

impl SequentialRunner {
    #[must_use]
    pub fn new(executor: CaseExecutor) -> Self {
        Self {
            executor,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    #[must_use]
    pub fn executor(&self) -> &CaseExecutor {
        &self.executor
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Discover fixture files for `source` using this runner's filter.
    #[must_use]
    pub fn collect_test_files(&self, source: &dyn TestSource) -> Vec<PathBuf> {
        discovery::collect_test_files(source, self.executor.filter(), &self.extension)
    }

    /// Count the cases that a run would execute, without validating anything.
    #[must_use]
    pub fn count_tests(&self, source: &dyn TestSource, files: Option<&[PathBuf]>) -> usize {
        let discovered;
        let files: &[PathBuf] = match files {
            Some(files) => files,
            None => {
                discovered = self.collect_test_files(source);
                &discovered
            }
        };
        files
            .iter()
            .map(|path| self.executor.count_file(source, path))
            .sum()
    }

    /// Run every case, reporting each result to `progress` as it completes.
    ///
    /// Without an explicit `files` list the runner discovers files itself.
    /// Duration is the wall-clock time of the whole run.
    pub fn run(
        &self,
        source: &dyn TestSource,
        files: Option<&[PathBuf]>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Suite {
        let start = Instant::now();
        let discovered;
        let files: &[PathBuf] = match files {
            Some(files) => files,
            None => {
                discovered = self.collect_test_files(source);
                &discovered
            }
        };

        let mut results = Vec::new();
        for path in files {
            let sink = progress.as_mut().map(|p| &mut **p as &mut dyn ProgressSink);
            results.extend(self.executor.execute_file(source, path, sink));
        }

        tracing::debug!(
            source = source.name(),
            files = files.len(),
            cases = results.len(),
            "sequential run complete"
        );
        Suite::new(source.name(), results, start.elapsed())
    }
}
