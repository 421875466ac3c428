//! File- and case-level inclusion predicates.
//!
//! Precedence for a case: exclude-regex (short-circuits), then tag
//! membership, then name-regex against `"<group> - <description>"`. Files are
//! judged by the path glob alone. Unset predicates are no-ops.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;
use thiserror::Error;

use crate::result::CaseResult;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid regex '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid glob '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    name: Option<Regex>,
    path: Option<GlobMatcher>,
    exclude: Option<Regex>,
    tag: Option<String>,
}

impl CaseFilter {
    /// A filter with no predicates (identity).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, pattern: &str) -> Result<Self, FilterError> {
        self.name = Some(compile_regex(pattern)?);
        Ok(self)
    }

    pub fn with_exclude(mut self, pattern: &str) -> Result<Self, FilterError> {
        self.exclude = Some(compile_regex(pattern)?);
        Ok(self)
    }

    pub fn with_path(mut self, pattern: &str) -> Result<Self, FilterError> {
        let glob = Glob::new(pattern).map_err(|source| FilterError::InvalidGlob {
            pattern: pattern.to_string(),
            source,
        })?;
        self.path = Some(glob.compile_matcher());
        Ok(self)
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.path.is_none() && self.exclude.is_none() && self.tag.is_none()
    }

    /// File-level inclusion. `root` lets the glob match the relative path;
    /// the full path is tried as a fallback.
    #[must_use]
    pub fn includes_file(&self, path: &Path, root: &Path) -> bool {
        let Some(glob) = &self.path else {
            return true;
        };
        match path.strip_prefix(root) {
            Ok(relative) if glob.is_match(relative) => true,
            _ => glob.is_match(path),
        }
    }

    /// Case-level inclusion.
    #[must_use]
    pub fn includes_case(&self, group: &str, description: &str, tags: &[String]) -> bool {
        let display = format!("{group} - {description}");
        if let Some(exclude) = &self.exclude
            && exclude.is_match(&display)
        {
            return false;
        }
        if let Some(tag) = &self.tag
            && !tags.iter().any(|t| t == tag)
        {
            return false;
        }
        match &self.name {
            Some(name) => name.is_match(&display),
            None => true,
        }
    }

    #[must_use]
    pub fn filter_files(&self, files: &[PathBuf], root: &Path) -> Vec<PathBuf> {
        files
            .iter()
            .filter(|path| self.includes_file(path, root))
            .cloned()
            .collect()
    }

    /// Apply case-level predicates to already produced results.
    #[must_use]
    pub fn filter_results(&self, results: &[CaseResult]) -> Vec<CaseResult> {
        results
            .iter()
            .filter(|r| self.includes_case(&r.group, &r.description, &r.tags))
            .cloned()
            .collect()
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
        pattern: pattern.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn case(group: &str, description: &str, tags: &[&str]) -> CaseResult {
        CaseResult {
            id: format!("s::f::{group}::{description}"),
            file: PathBuf::from("/root/f.json"),
            group: group.to_string(),
            description: description.to_string(),
            expected: true,
            actual: true,
            passed: true,
            error: None,
            message: None,
            duration: Duration::ZERO,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        }
    }

    fn sample() -> Vec<CaseResult> {
        vec![
            case("strings", "empty string", &["smoke"]),
            case("strings", "unicode", &[]),
            case("numbers", "negative", &["smoke", "slow"]),
            case("numbers", "overflow", &["slow"]),
        ]
    }

    #[test]
    fn empty_filter_is_identity() {
        let filter = CaseFilter::new();
        assert!(filter.is_empty());
        let input = sample();
        assert_eq!(filter.filter_results(&input), input);

        let files = vec![PathBuf::from("/root/b.json"), PathBuf::from("/root/a.json")];
        assert_eq!(filter.filter_files(&files, Path::new("/root")), files);
    }

    #[test]
    fn exclude_short_circuits_before_tag_and_name() {
        let filter = CaseFilter::new()
            .with_exclude("negative")
            .and_then(|f| f.with_name("numbers"))
            .expect("valid patterns")
            .with_tag("smoke");
        assert!(!filter.includes_case("numbers", "negative", &["smoke".into()]));
        assert!(filter.includes_case("numbers", "positive", &["smoke".into()]));
        assert!(!filter.includes_case("numbers", "positive", &[]));
    }

    #[test]
    fn exclude_then_name_equals_name_over_complement() {
        let input = sample();
        let exclude = CaseFilter::new().with_exclude("overflow").expect("regex");
        let name = CaseFilter::new().with_name("^numbers").expect("regex");
        let both = CaseFilter::new()
            .with_exclude("overflow")
            .and_then(|f| f.with_name("^numbers"))
            .expect("regex");

        let complement = exclude.filter_results(&input);
        assert_eq!(both.filter_results(&input), name.filter_results(&complement));
        assert_eq!(both.filter_results(&input).len(), 1);
    }

    #[test]
    fn tag_requires_exact_membership() {
        let filter = CaseFilter::new().with_tag("slow");
        let kept: Vec<String> = filter
            .filter_results(&sample())
            .into_iter()
            .map(|r| r.description)
            .collect();
        assert_eq!(kept, ["negative", "overflow"]);
        assert!(!CaseFilter::new().with_tag("slo").includes_case("g", "d", &["slow".into()]));
    }

    #[test]
    fn path_glob_matches_relative_or_absolute() {
        let root = Path::new("/fixtures");
        let relative = CaseFilter::new().with_path("draft*/**/*.json").expect("glob");
        assert!(relative.includes_file(Path::new("/fixtures/draft7/core/type.json"), root));
        assert!(!relative.includes_file(Path::new("/fixtures/v1/type.json"), root));

        let absolute = CaseFilter::new().with_path("/fixtures/v1/*.json").expect("glob");
        assert!(absolute.includes_file(Path::new("/fixtures/v1/type.json"), root));
    }

    #[test]
    fn path_glob_does_not_affect_cases() {
        let filter = CaseFilter::new().with_path("nothing/*").expect("glob");
        assert!(filter.includes_case("any", "case", &[]));
    }

    #[test]
    fn invalid_patterns_are_reported() {
        assert!(matches!(
            CaseFilter::new().with_name("("),
            Err(FilterError::InvalidRegex { .. })
        ));
        assert!(matches!(
            CaseFilter::new().with_path("a[b"),
            Err(FilterError::InvalidGlob { .. })
        ));
    }
}
