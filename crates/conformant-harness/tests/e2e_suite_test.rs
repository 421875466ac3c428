//! Integration test: end-to-end suite runs
//!
//! Validates that:
//! 1. A fully agreeing fixture reports 100% (scenario A).
//! 2. A forced mismatch reports exactly one failure at 50% (scenario B).
//! 3. Malformed groups and cases are skipped without losing their siblings.
//! 4. Validator errors and panics fail one case and nothing else.
//! 5. Filters, custom assertions, and the configured pipeline compose.
//!
//! Run: cargo test -p conformant-harness --test e2e_suite_test

use std::path::Path;
use std::sync::Arc;

use conformant_harness::{
    Assertion, AssertionRegistry, CaseExecutor, CaseFilter, CaseResult, FixtureValue, Harness,
    HarnessConfig, SequentialRunner, SourceError, TestSource, TypeKeywordSource,
    ValidationOutcome,
};
use serde_json::json;

fn write_fixture(root: &Path, rel: &str, doc: &serde_json::Value) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("fixture has parent")).expect("mkdir");
    std::fs::write(path, doc.to_string()).expect("write fixture");
}

fn strings_fixture(number_valid: bool) -> serde_json::Value {
    json!([{
        "description": "strings",
        "schema": {"type": "string"},
        "tests": [
            {"description": "a string", "data": "hello", "valid": true},
            {"description": "a number", "data": 42, "valid": number_valid}
        ]
    }])
}

#[test]
fn scenario_a_everything_agrees() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path(), "strings.json", &strings_fixture(false));
    let source = TypeKeywordSource::new("reference", dir.path());

    let suite = SequentialRunner::default().run(&source, None, None);
    assert_eq!(suite.total_tests(), 2);
    assert_eq!(suite.passed_tests(), 2);
    assert!((suite.pass_rate() - 100.0).abs() < f64::EPSILON);
    assert!(suite.results.iter().all(|r| r.error.is_none() && r.message.is_none()));
}

#[test]
fn scenario_b_one_forced_mismatch() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path(), "strings.json", &strings_fixture(true));
    let source = TypeKeywordSource::new("reference", dir.path());

    let suite = SequentialRunner::default().run(&source, None, None);
    assert_eq!(suite.passed_tests(), 1);
    assert_eq!(suite.failed_tests(), 1);
    assert!((suite.pass_rate() - 50.0).abs() < f64::EPSILON);

    let failure = suite.failures().next().expect("one failure");
    assert_eq!(failure.id, "reference::strings::0::1");
    assert_eq!(failure.display_name(), "strings - a number");
    assert!(failure.expected);
    assert!(!failure.actual);
    assert!(failure.error.is_none());
    assert_eq!(
        failure.message.as_deref(),
        Some("expected valid but validator reported invalid for 42")
    );
}

#[test]
fn malformed_content_is_skipped_at_smallest_granularity() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        "mixed.json",
        &json!([
            {"description": "no tests key"},
            {
                "description": "partly broken",
                "schema": {"type": "boolean"},
                "tests": [
                    {"description": "missing data", "valid": true},
                    {"description": "ok", "data": true, "valid": true},
                    {"description": "valid is a string", "data": false, "valid": "yes"}
                ]
            }
        ]),
    );
    std::fs::write(dir.path().join("broken.json"), "[{").expect("write broken");
    write_fixture(dir.path(), "object-root.json", &json!({"tests": []}));
    let source = TypeKeywordSource::new("reference", dir.path());

    let runner = SequentialRunner::default();
    let suite = runner.run(&source, None, None);
    assert_eq!(suite.total_tests(), 1);
    assert_eq!(suite.results[0].id, "reference::mixed::1::1");
    assert!(suite.all_passed());
    assert_eq!(runner.count_tests(&source, None), 1);
}

#[test]
fn missing_directory_is_an_empty_suite() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = TypeKeywordSource::new("reference", dir.path().join("absent"));
    let suite = SequentialRunner::default().run(&source, None, None);
    assert_eq!(suite.total_tests(), 0);
    assert!((suite.pass_rate() - 100.0).abs() < f64::EPSILON);
}

/// Errors on objects and panics on arrays; everything else is valid.
struct Brittle {
    root: std::path::PathBuf,
}

impl TestSource for Brittle {
    fn name(&self) -> &str {
        "brittle"
    }

    fn test_directory(&self) -> &Path {
        &self.root
    }

    fn validate(
        &self,
        data: &FixtureValue,
        _schema: &FixtureValue,
    ) -> Result<ValidationOutcome, SourceError> {
        match data {
            FixtureValue::Map(_) => Err(SourceError::Validator("objects unsupported".into())),
            FixtureValue::List(_) => panic!("index out of range"),
            _ => Ok(ValidationOutcome::valid()),
        }
    }
}

#[test]
fn validator_failures_are_contained_per_case() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        "cases.json",
        &json!([{"tests": [
            {"description": "before", "data": 1, "valid": true},
            {"description": "object", "data": {"a": 1}, "valid": true},
            {"description": "array", "data": [1], "valid": true},
            {"description": "after", "data": "x", "valid": true}
        ]}]),
    );
    let source = Brittle {
        root: dir.path().to_path_buf(),
    };

    let suite = SequentialRunner::default().run(&source, None, None);
    let outcomes: Vec<bool> = suite.results.iter().map(|r| r.passed).collect();
    assert_eq!(outcomes, [true, false, false, true]);
    assert_eq!(
        suite.results[1].error.as_deref(),
        Some("validator error: objects unsupported")
    );
    assert!(
        suite.results[2]
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("validator panicked") && e.contains("index out of range"))
    );
}

#[test]
fn progress_sink_sees_every_case_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path(), "a.json", &strings_fixture(false));
    write_fixture(dir.path(), "b.json", &strings_fixture(true));
    let source = TypeKeywordSource::new("reference", dir.path());

    let mut seen: Vec<(String, bool)> = Vec::new();
    let mut sink = |r: &CaseResult| seen.push((r.id.clone(), r.passed));
    let suite = SequentialRunner::default().run(&source, None, Some(&mut sink));

    let expected: Vec<(String, bool)> = suite.results.iter().map(|r| (r.id.clone(), r.passed)).collect();
    assert_eq!(seen, expected);
    assert_eq!(seen.len(), 4);
}

#[test]
fn filters_select_cases_and_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(dir.path(), "core/strings.json", &strings_fixture(false));
    write_fixture(
        dir.path(),
        "extra/numbers.json",
        &json!([{
            "description": "numbers",
            "schema": {"type": "number"},
            "tests": [
                {"description": "float", "data": 1.5, "valid": true, "tags": ["slow"]},
                {"description": "text", "data": "1.5", "valid": false}
            ]
        }]),
    );
    let source = TypeKeywordSource::new("reference", dir.path());
    let run = |filter: CaseFilter| {
        SequentialRunner::new(CaseExecutor::new().with_filter(filter)).run(&source, None, None)
    };

    let by_path = run(CaseFilter::new().with_path("core/**").expect("glob"));
    assert_eq!(by_path.total_tests(), 2);

    let by_name = run(CaseFilter::new().with_name("^numbers - ").expect("regex"));
    assert_eq!(by_name.total_tests(), 2);

    let by_tag = run(CaseFilter::new().with_tag("slow"));
    let ids: Vec<&str> = by_tag.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["reference::numbers::0::0"]);

    let excluded = run(CaseFilter::new().with_exclude("a number|text").expect("regex"));
    assert_eq!(excluded.total_tests(), 2);

    let unfiltered = run(CaseFilter::new());
    assert_eq!(unfiltered.total_tests(), 4);
    let refiltered = CaseFilter::new()
        .with_exclude("a number|text")
        .expect("regex")
        .filter_results(&unfiltered.results);
    let refiltered_ids: Vec<&str> = refiltered.iter().map(|r| r.id.as_str()).collect();
    let excluded_ids: Vec<&str> = excluded.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(refiltered_ids, excluded_ids);
}

/// Accepts any outcome; used for fixtures documenting known divergences.
struct Lenient;

impl Assertion for Lenient {
    fn assert(&self, _data: &FixtureValue, _expected: bool, _actual: bool) -> bool {
        true
    }

    fn failure_message(&self, _data: &FixtureValue, _expected: bool, _actual: bool) -> String {
        String::new()
    }
}

#[test]
fn custom_assertions_and_unknown_names() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_fixture(
        dir.path(),
        "custom.json",
        &json!([{
            "schema": {"type": "null"},
            "tests": [
                {"description": "lenient", "data": 1, "valid": true, "assertion": "lenient"},
                {"description": "typo", "data": 1, "valid": true, "assertion": "lenEint"}
            ]
        }]),
    );
    let mut registry = AssertionRegistry::new();
    registry.register("lenient", Arc::new(Lenient));

    let config = HarnessConfig::default();
    let harness = Harness::new(config).expect("harness").with_assertions(registry);
    let source: Arc<dyn TestSource> = Arc::new(TypeKeywordSource::new("reference", dir.path()));
    let suite = harness.run(source, None).expect("run");

    let outcomes: Vec<bool> = suite.results.iter().map(|r| r.passed).collect();
    assert_eq!(outcomes, [true, false], "unknown names fall back to strict equality");
}

#[test]
fn invalid_filter_patterns_are_reported() {
    let mut config = HarnessConfig::default();
    config.filter.path = Some("[".into());
    assert!(Harness::new(config).is_err());
}
