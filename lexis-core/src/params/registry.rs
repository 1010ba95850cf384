//! Path pattern registry and segment-wise path matching.
//!
//! Patterns are `/`-delimited. A `*` segment matches exactly one request
//! segment; every other segment must be byte-equal. A pattern only matches
//! a request path with the same number of segments.

use std::collections::HashSet;

use super::types::{ParamDefinition, ParamType};
use crate::error::SchemaError;

const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// A compiled path pattern such as `/words/*/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, SchemaError> {
        if !pattern.starts_with('/') {
            return Err(SchemaError::InvalidPattern {
                pattern: pattern.to_string(),
            });
        }
        let segments = pattern
            .split('/')
            .map(|segment| {
                if segment == WILDCARD {
                    Segment::Wildcard
                } else {
                    Segment::Literal(segment.to_lowercase())
                }
            })
            .collect();
        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against a request path that has already been lower-cased.
    pub fn matches(&self, normalized_path: &str) -> bool {
        let mut parts = normalized_path.split('/');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (Segment::Wildcard, Some(_)) => {}
                (Segment::Literal(expected), Some(actual)) => {
                    if expected != actual {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }
}

/// Static table of path patterns and the query parameters each expects.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct ParamRegistry {
    entries: Vec<(PathPattern, Vec<ParamDefinition>)>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern with its parameter definitions.
    ///
    /// Names must be unique within one pattern. The same name may appear
    /// under different patterns.
    pub fn register(
        mut self,
        pattern: &str,
        params: Vec<ParamDefinition>,
    ) -> Result<Self, SchemaError> {
        let compiled = PathPattern::parse(pattern)?;
        let mut seen = HashSet::new();
        for param in &params {
            if !seen.insert(param.name()) {
                return Err(SchemaError::DuplicateParam {
                    pattern: pattern.to_string(),
                    name: param.name().to_string(),
                });
            }
        }
        self.entries.push((compiled, params));
        Ok(self)
    }

    /// The registry served by the LEXIS API.
    pub fn service_default() -> Result<Self, SchemaError> {
        Self::new()
            .register(
                "/stub",
                vec![ParamDefinition::new("param1", ParamType::String)
                    .mandatory()
                    .case_sensitive()],
            )?
            .register(
                "/words/*/*",
                vec![ParamDefinition::new("fields", ParamType::Array).case_sensitive()],
            )?
            .register(
                "/roots/*/*",
                vec![ParamDefinition::new("words", ParamType::Boolean)],
            )?
            .register(
                "/verses/*",
                vec![
                    ParamDefinition::new("from", ParamType::Number),
                    ParamDefinition::new("to", ParamType::Number),
                    ParamDefinition::new("modified", ParamType::TimeRange),
                    ParamDefinition::new("limit", ParamType::Number),
                ],
            )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parameter definitions applicable to `path`.
    ///
    /// The path is lower-cased before matching. Definitions of every matching
    /// pattern are concatenated in registration order; no match yields an
    /// empty list.
    pub fn resolve_params(&self, path: &str) -> Vec<&ParamDefinition> {
        let normalized = path.to_lowercase();
        self.entries
            .iter()
            .filter(|(pattern, _)| pattern.matches(&normalized))
            .flat_map(|(_, params)| params.iter())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ParamRegistry {
        ParamRegistry::new()
            .register("/a/*/*", vec![ParamDefinition::new("x", ParamType::Number)])
            .unwrap()
            .register("/a/b/*", vec![ParamDefinition::new("y", ParamType::String)])
            .unwrap()
    }

    #[test]
    fn test_wildcard_matches_one_segment() {
        let pattern = PathPattern::parse("/a/*/*").unwrap();
        assert!(pattern.matches("/a/b/c"));
        assert!(!pattern.matches("/a/b"));
        assert!(!pattern.matches("/a/b/c/d"));
        assert!(!pattern.matches("/x/b/c"));
    }

    #[test]
    fn test_trailing_slash_changes_arity() {
        let pattern = PathPattern::parse("/stub").unwrap();
        assert!(pattern.matches("/stub"));
        assert!(!pattern.matches("/stub/"));
    }

    #[test]
    fn test_resolve_is_case_insensitive_on_path() {
        let reg = registry();
        let defs = reg.resolve_params("/A/B/C");
        let names: Vec<_> = defs.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_resolve_no_match_is_empty() {
        assert!(registry().resolve_params("/nothing/here").is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let err = ParamRegistry::new()
            .register(
                "/a",
                vec![
                    ParamDefinition::new("x", ParamType::Number),
                    ParamDefinition::new("x", ParamType::String),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateParam { .. }));
    }

    #[test]
    fn test_pattern_must_be_absolute() {
        let err = PathPattern::parse("words/*").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn test_service_default_builds() {
        let registry = ParamRegistry::service_default().unwrap();
        assert_eq!(registry.resolve_params("/stub").len(), 1);
        assert_eq!(registry.resolve_params("/verses/genesis").len(), 4);
        assert!(registry.resolve_params("/manage/health").is_empty());
    }
}
