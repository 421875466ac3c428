//! Integration test: batch-parallel execution
//!
//! Validates that:
//! 1. Parallel (3 workers) and sequential runs produce the same results.
//! 2. Results merge in batch order, independent of worker completion order.
//! 3. A decoder panic costs only its own file, in both modes.
//! 4. Non-UTF-8 fixture paths do not break equivalence.
//! 5. Partitioning preserves order and batch sizes for arbitrary inputs.
//!
//! Run: cargo test -p conformant-harness --test parallel_runner_test

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use conformant_harness::parallel::partition;
use conformant_harness::{
    CaseExecutor, FixtureValue, ParallelRunner, SequentialRunner, SourceError, Suite, TestSource,
    TypeKeywordSource, ValidationOutcome,
};
use proptest::prelude::*;
use serde_json::json;

fn write_fixture(root: &Path, rel: &str, doc: &serde_json::Value) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("fixture has parent")).expect("mkdir");
    std::fs::write(path, doc.to_string()).expect("write fixture");
}

fn populate(root: &Path, files: usize) {
    for i in 0..files {
        let doc = json!([
            {
                "description": format!("strings {i}"),
                "schema": {"type": "string"},
                "tests": [
                    {"description": "text", "data": "x", "valid": true},
                    {"description": "number", "data": i, "valid": i % 2 == 0}
                ]
            },
            {
                "description": format!("arrays {i}"),
                "schema": {"type": "array"},
                "tests": [{"description": "empty", "data": [], "valid": true}]
            }
        ]);
        write_fixture(root, &format!("set{}/file{i:02}.json", i % 3), &doc);
    }
}

fn fingerprint(suite: &Suite) -> Vec<(String, bool, bool, bool)> {
    suite
        .results
        .iter()
        .map(|r| (r.id.clone(), r.expected, r.actual, r.passed))
        .collect()
}

#[test]
fn parallel_matches_sequential() {
    let dir = tempfile::tempdir().expect("tempdir");
    populate(dir.path(), 7);
    let source: Arc<dyn TestSource> = Arc::new(TypeKeywordSource::new("ref", dir.path()));

    let sequential = SequentialRunner::default().run(source.as_ref(), None, None);
    let parallel = ParallelRunner::default().run(Arc::clone(&source), 3);

    assert_eq!(sequential.total_tests(), 21);
    assert_eq!(fingerprint(&parallel), fingerprint(&sequential));
    assert_eq!(parallel.name, "ref");
    assert_eq!(parallel.failed_tests(), 4, "even-numbered files wrongly expect a number to pass");
}

#[test]
fn trivial_inputs_fall_back_to_sequential() {
    let dir = tempfile::tempdir().expect("tempdir");
    populate(dir.path(), 1);
    let source: Arc<dyn TestSource> = Arc::new(TypeKeywordSource::new("ref", dir.path()));

    let one_file = ParallelRunner::default().run(Arc::clone(&source), 4);
    assert_eq!(one_file.total_tests(), 3);

    populate(dir.path(), 4);
    let one_worker = ParallelRunner::default().run(Arc::clone(&source), 1);
    let sequential = SequentialRunner::default().run(source.as_ref(), None, None);
    assert_eq!(fingerprint(&one_worker), fingerprint(&sequential));
}

/// Finishes batches in reverse order by sleeping longest on the first files.
struct Staggered {
    root: PathBuf,
}

impl TestSource for Staggered {
    fn name(&self) -> &str {
        "staggered"
    }

    fn test_directory(&self) -> &Path {
        &self.root
    }

    fn validate(
        &self,
        data: &FixtureValue,
        _schema: &FixtureValue,
    ) -> Result<ValidationOutcome, SourceError> {
        if let FixtureValue::Int(delay) = data {
            std::thread::sleep(Duration::from_millis(u64::try_from(*delay).unwrap_or(0)));
        }
        Ok(ValidationOutcome::valid())
    }
}

#[test]
fn merge_follows_batch_order_not_completion_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    for (i, delay) in [60, 40, 20, 0].iter().enumerate() {
        write_fixture(
            dir.path(),
            &format!("f{i}.json"),
            &json!([{"tests": [{"description": format!("case {i}"), "data": delay, "valid": true}]}]),
        );
    }
    let source: Arc<dyn TestSource> = Arc::new(Staggered {
        root: dir.path().to_path_buf(),
    });

    let suite = ParallelRunner::default().run(source, 4);
    let ids: Vec<&str> = suite.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        ids,
        [
            "staggered::f0::0::0",
            "staggered::f1::0::0",
            "staggered::f2::0::0",
            "staggered::f3::0::0"
        ]
    );
}

/// Delegates to the reference validator but blows up while decoding any
/// fixture that mentions "explode".
struct Volatile {
    inner: TypeKeywordSource,
}

impl TestSource for Volatile {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn test_directory(&self) -> &Path {
        self.inner.test_directory()
    }

    fn decode_json(&self, text: &str) -> Result<FixtureValue, SourceError> {
        assert!(!text.contains("explode"), "decoder crashed");
        self.inner.decode_json(text)
    }

    fn validate(
        &self,
        data: &FixtureValue,
        schema: &FixtureValue,
    ) -> Result<ValidationOutcome, SourceError> {
        self.inner.validate(data, schema)
    }
}

#[test]
fn decoder_panic_loses_only_its_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let case = |desc: &str| json!([{"schema": {"type": "null"}, "tests": [{"description": desc, "data": null, "valid": true}]}]);
    write_fixture(dir.path(), "a.json", &case("fine"));
    write_fixture(dir.path(), "b.json", &case("explode"));
    write_fixture(dir.path(), "c.json", &case("fine too"));

    let source: Arc<dyn TestSource> = Arc::new(Volatile {
        inner: TypeKeywordSource::new("vol", dir.path()),
    });

    let sequential = SequentialRunner::default().run(source.as_ref(), None, None);
    let ids: Vec<&str> = sequential.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["vol::a::0::0", "vol::c::0::0"]);
    assert!(sequential.all_passed());

    let parallel = ParallelRunner::new(CaseExecutor::new()).run(source, 3);
    assert_eq!(fingerprint(&parallel), fingerprint(&sequential));
}

#[cfg(unix)]
#[test]
fn non_utf8_fixture_paths_keep_modes_equivalent() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let doc = json!([{"schema": {"type": "string"}, "tests": [{"data": "s", "valid": true}]}]);
    for name in ["a.json", "c.json", "d.json"] {
        write_fixture(dir.path(), name, &doc);
    }
    std::fs::write(dir.path().join(OsStr::from_bytes(b"b\xff.json")), doc.to_string())
        .expect("write non-UTF-8 fixture");
    let source: Arc<dyn TestSource> = Arc::new(TypeKeywordSource::new("ref", dir.path()));

    let sequential = SequentialRunner::default().run(source.as_ref(), None, None);
    let parallel = ParallelRunner::default().run(Arc::clone(&source), 2);

    let ids: Vec<&str> = sequential.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["ref::a::0::0", "ref::c::0::0", "ref::d::0::0"]);
    assert_eq!(fingerprint(&parallel), fingerprint(&sequential));
}

proptest! {
    #[test]
    fn partition_preserves_order_and_sizes(len in 0usize..60, workers in 1usize..12) {
        let files: Vec<PathBuf> = (0..len).map(|i| PathBuf::from(format!("/fx/{i:03}.json"))).collect();
        let batches = partition(&files, workers);

        prop_assert_eq!(batches.concat(), files.clone());
        prop_assert!(batches.len() <= workers);
        if len > 0 {
            let size = len.div_ceil(workers);
            prop_assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            prop_assert!(batches[..batches.len() - 1].iter().all(|b| b.len() == size));
        } else {
            prop_assert!(batches.is_empty());
        }
    }
}
