//! End-to-end run pipeline.
//!
//! discover → (incremental selection) → sequential or parallel execution →
//! (snapshot save). The cache is saved over the full discovered list so
//! files skipped this run keep their mtimes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::assertion::AssertionRegistry;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::executor::{CaseExecutor, ProgressSink};
use crate::fuzz::FuzzRunner;
use crate::incremental::{IncrementalSelector, JsonFileStore};
use crate::parallel::ParallelRunner;
use crate::result::Suite;
use crate::runner::SequentialRunner;
use crate::source::TestSource;

/// A configured harness, ready to run sources.
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    executor: CaseExecutor,
}

impl Harness {
    /// Build a harness from `config`. Fails only on invalid filter patterns.
    pub fn new(config: HarnessConfig) -> Result<Self> {
        let executor = CaseExecutor::new().with_filter(config.build_filter()?);
        Ok(Self { config, executor })
    }

    #[must_use]
    pub fn with_assertions(mut self, assertions: AssertionRegistry) -> Self {
        self.executor = self.executor.with_assertions(Arc::new(assertions));
        self
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn sequential(&self) -> SequentialRunner {
        SequentialRunner::new(self.executor.clone()).with_extension(self.config.extension.clone())
    }

    /// Files this harness would consider for `source`, before incremental
    /// selection.
    #[must_use]
    pub fn discover(&self, source: &dyn TestSource) -> Vec<PathBuf> {
        self.sequential().collect_test_files(source)
    }

    /// Parse-only case count over the discovered files.
    #[must_use]
    pub fn count(&self, source: &dyn TestSource) -> usize {
        self.sequential().count_tests(source, None)
    }

    /// Run `source` end to end.
    ///
    /// With more than one worker, `progress` sees results after the merge,
    /// in batch order, rather than as each case completes.
    pub fn run(
        &self,
        source: Arc<dyn TestSource>,
        mut progress: Option<&mut dyn ProgressSink>,
    ) -> Result<Suite> {
        let discovered = self.discover(source.as_ref());
        tracing::info!(source = source.name(), files = discovered.len(), "discovered fixtures");

        let selector = self
            .config
            .incremental
            .then(|| IncrementalSelector::new(JsonFileStore::new(&self.config.cache_path)));
        let files = match &selector {
            Some(selector) => selector.filter_changed_files(&discovered),
            None => discovered.clone(),
        };

        let suite = if self.config.workers > 1 {
            let suite = ParallelRunner::new(self.executor.clone())
                .with_extension(self.config.extension.clone())
                .run_files(Arc::clone(&source), &files, self.config.workers);
            if let Some(sink) = progress.as_deref_mut() {
                suite.results.iter().for_each(|result| sink.advance(result));
            }
            suite
        } else {
            self.sequential().run(source.as_ref(), Some(&files), progress)
        };

        if let Some(selector) = &selector {
            selector.save_cache(&discovered)?;
        }
        tracing::info!(
            source = %suite.name,
            total = suite.total_tests(),
            failed = suite.failed_tests(),
            "run finished"
        );
        Ok(suite)
    }

    /// Fuzz `source` with the configured iteration count and seed.
    #[must_use]
    pub fn fuzz(&self, source: &dyn TestSource) -> Suite {
        let runner = match self.config.fuzz.seed {
            Some(seed) => FuzzRunner::new().with_seed(seed),
            None => FuzzRunner::new(),
        };
        runner.fuzz(source, self.config.fuzz.iterations)
    }
}
