//! Conformance test harness for JSON validators.
//!
//! This crate provides:
//! - Fixture loading: tolerant parsing of grouped JSON test fixtures
//! - Discovery and filtering: recursive file walk plus name/path/tag filters
//! - Execution: sequential and batch-parallel runners with per-case isolation
//! - Incremental selection: mtime snapshots to rerun only changed fixtures
//! - Fuzzing: fixed edge-case catalog plus seeded random inputs
//! - Reporting: serde-serializable suites and a structured JSONL run log

#![forbid(unsafe_code)]

pub mod assertion;
pub mod config;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod filter;
pub mod fixtures;
pub mod fuzz;
pub mod incremental;
pub mod parallel;
pub mod pipeline;
pub mod result;
pub mod runner;
pub mod source;
pub mod structured_log;
pub mod value;

pub use assertion::{Assertion, AssertionRegistry, StrictEquality};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use executor::{CaseExecutor, ProgressSink};
pub use filter::CaseFilter;
pub use fixtures::{FixtureCase, FixtureFile, FixtureGroup};
pub use fuzz::FuzzRunner;
pub use incremental::{IncrementalSelector, JsonFileStore, MtimeStore};
pub use parallel::ParallelRunner;
pub use pipeline::Harness;
pub use result::{CaseResult, Suite};
pub use runner::SequentialRunner;
pub use source::{SourceError, TestSource, TypeKeywordSource, ValidationOutcome};
pub use value::FixtureValue;
