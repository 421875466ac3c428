//! The validator capability the engine runs fixtures against.

use std::path::{Path, PathBuf};

use conformant_fixture_exec::execute_schema_case;
use thiserror::Error;

use crate::value::FixtureValue;

/// Errors raised by a [`TestSource`] while decoding or validating.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("validator error: {0}")]
    Validator(String),
}

/// What a validator reports for one `(data, schema)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn valid() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    #[must_use]
    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// A named collection of fixtures plus the implementation that judges them.
///
/// Sources are shared read-only with every parallel worker, hence
/// `Send + Sync`. Implementations must not rely on interior mutation for
/// correctness.
pub trait TestSource: Send + Sync {
    fn name(&self) -> &str;

    /// Root directory searched for fixture files.
    fn test_directory(&self) -> &Path;

    /// Source-level inclusion predicate applied during discovery.
    fn should_include_file(&self, _path: &Path) -> bool {
        true
    }

    fn decode_json(&self, text: &str) -> Result<FixtureValue, SourceError> {
        serde_json::from_str::<serde_json::Value>(text)
            .map(FixtureValue::from)
            .map_err(|err| SourceError::Decode(err.to_string()))
    }

    fn validate(
        &self,
        data: &FixtureValue,
        schema: &FixtureValue,
    ) -> Result<ValidationOutcome, SourceError>;
}

/// Reference source backed by the `type`-keyword validator in
/// `conformant-fixture-exec`.
#[derive(Debug, Clone)]
pub struct TypeKeywordSource {
    name: String,
    root: PathBuf,
}

impl TypeKeywordSource {
    #[must_use]
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }
}

impl TestSource for TypeKeywordSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn test_directory(&self) -> &Path {
        &self.root
    }

    fn validate(
        &self,
        data: &FixtureValue,
        schema: &FixtureValue,
    ) -> Result<ValidationOutcome, SourceError> {
        let run = execute_schema_case(&data.to_json(), &schema.to_json())
            .map_err(|err| SourceError::Validator(err.to_string()))?;
        if run.valid {
            Ok(ValidationOutcome::valid())
        } else {
            Ok(ValidationOutcome::invalid(run.note.into_iter().collect()))
        }
    }
}
