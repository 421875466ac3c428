//! Pass/fail decisions for executed cases.
//!
//! Fixtures may name a custom assertion; unknown or absent names resolve to
//! [`StrictEquality`] so a typo never turns into a harness error.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::value::FixtureValue;

pub trait Assertion: Send + Sync {
    fn assert(&self, data: &FixtureValue, expected: bool, actual: bool) -> bool;

    fn failure_message(&self, data: &FixtureValue, expected: bool, actual: bool) -> String;
}

/// Default rule: the validator must agree with the recorded outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictEquality;

impl Assertion for StrictEquality {
    fn assert(&self, _data: &FixtureValue, expected: bool, actual: bool) -> bool {
        expected == actual
    }

    fn failure_message(&self, data: &FixtureValue, expected: bool, actual: bool) -> String {
        format!(
            "expected {} but validator reported {} for {}",
            validity(expected),
            validity(actual),
            data.preview(80)
        )
    }
}

fn validity(valid: bool) -> &'static str {
    if valid { "valid" } else { "invalid" }
}

/// Named custom assertions. Immutable once handed to a runner.
#[derive(Clone, Default)]
pub struct AssertionRegistry {
    named: BTreeMap<String, Arc<dyn Assertion>>,
}

impl AssertionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, assertion: Arc<dyn Assertion>) -> &mut Self {
        self.named.insert(name.into(), assertion);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Resolve a fixture's assertion name, falling back to strict equality.
    #[must_use]
    pub fn resolve(&self, name: Option<&str>) -> &dyn Assertion {
        name.and_then(|n| self.named.get(n))
            .map_or(&StrictEquality as &dyn Assertion, |a| a.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for AssertionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertionRegistry")
            .field("named", &self.named.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysPass;

    impl Assertion for AlwaysPass {
        fn assert(&self, _: &FixtureValue, _: bool, _: bool) -> bool {
            true
        }

        fn failure_message(&self, _: &FixtureValue, _: bool, _: bool) -> String {
            String::from("unreachable")
        }
    }

    #[test]
    fn strict_equality_compares_outcomes() {
        let data = FixtureValue::Int(1);
        assert!(StrictEquality.assert(&data, true, true));
        assert!(StrictEquality.assert(&data, false, false));
        assert!(!StrictEquality.assert(&data, true, false));
        assert_eq!(
            StrictEquality.failure_message(&data, true, false),
            "expected valid but validator reported invalid for 1"
        );
    }

    #[test]
    fn unknown_and_absent_names_resolve_to_default() {
        let mut registry = AssertionRegistry::new();
        registry.register("lenient", Arc::new(AlwaysPass));
        let data = FixtureValue::Null;

        assert!(registry.resolve(Some("lenient")).assert(&data, true, false));
        assert!(!registry.resolve(Some("no-such-rule")).assert(&data, true, false));
        assert!(!registry.resolve(None).assert(&data, true, false));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["lenient"]);
    }
}
