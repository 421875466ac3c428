//! Batch-parallel fixture execution.
//!
//! The sorted file list is cut into contiguous batches of
//! `ceil(files / workers)`. Each batch runs on its own worker thread holding
//! an immutable snapshot (shared source, cloned executor, owned batch) and
//! serializes its results to a private file in a per-run scratch directory.
//! The orchestrator joins workers and reads their files back in batch order,
//! so the merged suite does not depend on which worker finished first.
//!
//! A worker whose output is missing or unreadable contributes no results;
//! the remaining batches are unaffected. Joins block without a timeout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::discovery::{self, DEFAULT_EXTENSION};
use crate::executor::CaseExecutor;
use crate::result::{CaseResult, Suite};
use crate::runner::SequentialRunner;
use crate::source::TestSource;

/// Split `files` into contiguous batches of `ceil(len / worker_count)`.
///
/// Order is preserved and every batch holds at least one file.
#[must_use]
pub fn partition(files: &[PathBuf], worker_count: usize) -> Vec<Vec<PathBuf>> {
    if files.is_empty() {
        return Vec::new();
    }
    let size = files.len().div_ceil(worker_count.max(1));
    files.chunks(size).map(<[PathBuf]>::to_vec).collect()
}

/// What a worker writes to its output file.
#[derive(Debug, Serialize, Deserialize)]
struct BatchOutput {
    batch: usize,
    results: Vec<CaseResult>,
}

struct BatchWorker {
    index: usize,
    source: Arc<dyn TestSource>,
    executor: CaseExecutor,
    files: Vec<PathBuf>,
    output: PathBuf,
}

impl BatchWorker {
    fn run(self) {
        let mut results = Vec::new();
        for path in &self.files {
            results.extend(self.executor.execute_file(self.source.as_ref(), path, None));
        }
        let payload = BatchOutput {
            batch: self.index,
            results,
        };
        let written = serde_json::to_vec(&payload)
            .map_err(std::io::Error::other)
            .and_then(|body| std::fs::write(&self.output, body));
        if let Err(err) = written {
            tracing::warn!(batch = self.index, error = %err, "worker could not write its results");
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParallelRunner {
    executor: CaseExecutor,
    extension: String,
}

impl Default for ParallelRunner {
    fn default() -> Self {
        Self::new(CaseExecutor::new())
    }
}

impl ParallelRunner {
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

    /// Discover files for `source` and run them across `worker_count` workers.
    pub fn run(&self, source: Arc<dyn TestSource>, worker_count: usize) -> Suite {
        let files = discovery::collect_test_files(
            source.as_ref(),
            self.executor.filter(),
            &self.extension,
        );
        self.run_files(source, &files, worker_count)
    }

    /// Run an explicit, already sorted file list across `worker_count` workers.
    ///
    /// Trivial inputs (one file or fewer, or a single worker) run
    /// sequentially in-process.
    pub fn run_files(
        &self,
        source: Arc<dyn TestSource>,
        files: &[PathBuf],
        worker_count: usize,
    ) -> Suite {
        if files.len() <= 1 || worker_count <= 1 {
            return self.sequential().run(source.as_ref(), Some(files), None);
        }

        let scratch = match tempfile::Builder::new().prefix("conformant-run-").tempdir() {
            Ok(dir) => dir,
            Err(err) => {
                tracing::warn!(error = %err, "no scratch directory for workers; running sequentially");
                return self.sequential().run(source.as_ref(), Some(files), None);
            }
        };

        let start = Instant::now();
        let batches = partition(files, worker_count);
        tracing::debug!(
            source = source.name(),
            files = files.len(),
            batches = batches.len(),
            "dispatching workers"
        );

        let mut pending = Vec::with_capacity(batches.len());
        for (index, batch) in batches.into_iter().enumerate() {
            let output = scratch.path().join(format!("batch-{index:04}.json"));
            let worker = BatchWorker {
                index,
                source: Arc::clone(&source),
                executor: self.executor.clone(),
                files: batch,
                output: output.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("conformant-worker-{index}"))
                .spawn(move || worker.run());
            match handle {
                Ok(handle) => pending.push((index, output, Some(handle))),
                Err(err) => {
                    tracing::warn!(batch = index, error = %err, "failed to launch worker");
                    pending.push((index, output, None));
                }
            }
        }

        let mut results = Vec::new();
        for (index, output, handle) in pending {
            if let Some(handle) = handle
                && handle.join().is_err()
            {
                tracing::warn!(batch = index, "worker panicked; batch contributes no results");
            }
            results.extend(read_batch_output(index, &output));
            // Best effort; the scratch directory is removed on drop anyway.
            let _ = std::fs::remove_file(&output);
        }

        let duration = start.elapsed();
        tracing::debug!(cases = results.len(), "merged worker results");
        Suite::new(source.name(), results, duration)
    }

    fn sequential(&self) -> SequentialRunner {
        SequentialRunner::new(self.executor.clone()).with_extension(self.extension.clone())
    }
}

fn read_batch_output(index: usize, path: &Path) -> Vec<CaseResult> {
    let body = match std::fs::read_to_string(path) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!(batch = index, error = %err, "worker output missing");
            return Vec::new();
        }
    };
    match serde_json::from_str::<BatchOutput>(&body) {
        Ok(output) if output.batch == index => output.results,
        Ok(output) => {
            tracing::warn!(batch = index, found = output.batch, "worker output belongs to another batch");
            Vec::new()
        }
        Err(err) => {
            tracing::warn!(batch = index, error = %err, "worker output is corrupt");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("/f/{i:02}.json"))).collect()
    }

    #[test]
    fn partition_uses_ceiling_sized_contiguous_batches() {
        let batches = partition(&paths(7), 3);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, [3, 3, 1]);
        assert_eq!(batches.concat(), paths(7));

        // Fewer batches than workers is fine.
        assert_eq!(partition(&paths(4), 3).len(), 2);
        assert_eq!(partition(&paths(2), 8).len(), 2);
        assert!(partition(&[], 4).is_empty());
    }

    #[test]
    fn corrupt_or_missing_output_reads_as_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let garbage = dir.path().join("batch-0000.json");
        std::fs::write(&garbage, "{not json").expect("write");
        assert!(read_batch_output(0, &garbage).is_empty());
        assert!(read_batch_output(1, &dir.path().join("absent.json")).is_empty());

        let foreign = dir.path().join("batch-0002.json");
        std::fs::write(&foreign, r#"{"batch": 9, "results": []}"#).expect("write");
        assert!(read_batch_output(2, &foreign).is_empty());
    }
}
