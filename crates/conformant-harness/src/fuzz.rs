//! Crash probing with generated inputs.
//!
//! Every value is validated once against an always-accepting schema. There
//! is no expected outcome to compare with, so a value that completes is
//! recorded as passed whatever the validator said; only an error or a panic
//! fails. The edge-case catalog is fixed so crash regressions reproduce; the
//! random phase is reproducible when a seed is supplied.

use std::path::PathBuf;
use std::time::Instant;

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::executor::validate_guarded;
use crate::result::{CaseResult, Suite};
use crate::source::TestSource;
use crate::value::FixtureValue;

/// Number of values in [`edge_cases`].
pub const EDGE_CASE_COUNT: usize = 24;

const INT_BOUND: i64 = 1_000;
const FLOAT_BOUND: f64 = 1_000.0;
const MAX_STRING_LEN: usize = 32;
const MAX_CONTAINER_LEN: usize = 5;
const KEY_VOCABULARY: &[&str] = &[
    "id", "name", "value", "type", "items", "enabled", "count", "tags",
];

const FUZZ_FILE: &str = "<fuzz>";
const FUZZ_TAG: &str = "fuzzed";
const ERROR_TAG: &str = "error";

/// The fixed edge-case catalog, identical on every call.
#[must_use]
pub fn edge_cases() -> Vec<FixtureValue> {
    use FixtureValue::{Bool, Float, Int, List, Map, Null, String as Str};

    vec![
        Null,
        Bool(true),
        Bool(false),
        Int(0),
        Int(1),
        Int(-1),
        Int(i64::MAX),
        Int(i64::MIN),
        Float(-0.0),
        Float(std::f64::consts::PI),
        Float(f64::MAX),
        Float(-f64::MAX),
        Float(f64::MIN_POSITIVE),
        Str(String::new()),
        Str(" ".into()),
        Str("\t\n\r ".into()),
        Str("a".repeat(10_000)),
        Str("ünïcödé ✓ 🦀 \u{0}".into()),
        List(Vec::new()),
        List(vec![List(vec![List(vec![List(Vec::new())])])]),
        List(vec![Int(1), Str("two".into()), Null, Bool(true), Float(4.5)]),
        Map(Vec::new()),
        Map(vec![
            ("key".into(), Str("value".into())),
            (
                "nested".into(),
                Map(vec![("a".into(), List(vec![Int(1), Int(2)]))]),
            ),
        ]),
        Map(vec![
            ("0".into(), Str("zero".into())),
            ("1".into(), Str("one".into())),
            ("2".into(), Str("two".into())),
        ]),
    ]
}

/// Generates and runs fuzz values.
#[derive(Debug, Clone, Default)]
pub struct FuzzRunner {
    seed: Option<u64>,
}

impl FuzzRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the random phase to a reproducible sequence.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Produce the `n` random values this runner would use.
    #[must_use]
    pub fn random_values(&self, n: usize) -> Vec<FixtureValue> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..n).map(|_| random_value(&mut rng)).collect()
    }

    /// Run the edge-case catalog plus `n` random values.
    ///
    /// Always yields exactly `EDGE_CASE_COUNT + n` results.
    pub fn fuzz(&self, source: &dyn TestSource, n: usize) -> Suite {
        let start = Instant::now();
        let always_valid = FixtureValue::Bool(true);

        let catalog = edge_cases().into_iter().map(|v| ("edge-cases", v));
        let random = self.random_values(n).into_iter().map(|v| ("random", v));

        let results = catalog
            .chain(random)
            .enumerate()
            .map(|(index, (group, value))| run_one(source, index, group, &value, &always_valid))
            .collect();

        Suite::new(format!("{} (fuzz)", source.name()), results, start.elapsed())
    }
}

/// Convenience wrapper over an unseeded [`FuzzRunner`].
pub fn fuzz(source: &dyn TestSource, n: usize) -> Suite {
    FuzzRunner::new().fuzz(source, n)
}

fn run_one(
    source: &dyn TestSource,
    index: usize,
    group: &str,
    value: &FixtureValue,
    schema: &FixtureValue,
) -> CaseResult {
    let start = Instant::now();
    let outcome = validate_guarded(source, value, schema);
    let duration = start.elapsed();

    let (expected, actual, passed, error, tags) = match outcome {
        Ok(outcome) => {
            let valid = outcome.is_valid();
            (valid, valid, true, None, vec![FUZZ_TAG.to_string()])
        }
        Err(err) => (
            true,
            false,
            false,
            Some(err),
            vec![FUZZ_TAG.to_string(), ERROR_TAG.to_string()],
        ),
    };

    CaseResult {
        id: format!("{}::fuzz::{index}", source.name()),
        file: PathBuf::from(FUZZ_FILE),
        group: group.to_string(),
        description: format!("{}: {}", value.kind(), value.preview(60)),
        expected,
        actual,
        passed,
        error,
        message: None,
        duration,
        tags,
    }
}

/// One of seven kinds, chosen uniformly.
fn random_value<R: Rng>(rng: &mut R) -> FixtureValue {
    match rng.gen_range(0..7) {
        kind @ 0..=4 => scalar_of_kind(rng, kind),
        5 => {
            let len = rng.gen_range(0..=MAX_CONTAINER_LEN);
            FixtureValue::List((0..len).map(|_| random_scalar(rng)).collect())
        }
        _ => {
            let len = rng.gen_range(0..=MAX_CONTAINER_LEN);
            FixtureValue::Map(
                (0..len)
                    .map(|_| {
                        let key = KEY_VOCABULARY[rng.gen_range(0..KEY_VOCABULARY.len())];
                        (key.to_string(), random_scalar(rng))
                    })
                    .collect(),
            )
        }
    }
}

/// Null, bool, bounded int, bounded float, or a short string.
fn random_scalar<R: Rng>(rng: &mut R) -> FixtureValue {
    let kind = rng.gen_range(0..5);
    scalar_of_kind(rng, kind)
}

fn scalar_of_kind<R: Rng>(rng: &mut R, kind: u32) -> FixtureValue {
    match kind {
        0 => FixtureValue::Null,
        1 => FixtureValue::Bool(rng.gen_bool(0.5)),
        2 => FixtureValue::Int(rng.gen_range(-INT_BOUND..=INT_BOUND)),
        3 => FixtureValue::Float(rng.gen_range(-FLOAT_BOUND..=FLOAT_BOUND)),
        _ => FixtureValue::String(random_string(rng)),
    }
}

fn random_string<R: Rng>(rng: &mut R) -> String {
    let len = rng.gen_range(0..=MAX_STRING_LEN);
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}
