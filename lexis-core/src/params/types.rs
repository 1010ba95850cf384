//! Parameter definitions and the typed values they coerce to.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ============================================================================
// PARAMETER TYPES
// ============================================================================

/// Shape a query parameter value must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamType {
    /// Any decoded string.
    String,
    /// Integer, parsed from the leading numeric run of the value.
    Number,
    /// Floating point, parsed from the leading numeric run of the value.
    Float,
    /// `true` or `false`, compared case-insensitively.
    Boolean,
    /// Comma-separated list of non-empty elements.
    Array,
    /// ISO-8601 date-time.
    Date,
    /// Two ISO-8601 date-times separated by `/`, start not after end.
    TimeRange,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParamType::String => "STRING",
            ParamType::Number => "NUMBER",
            ParamType::Float => "FLOAT",
            ParamType::Boolean => "BOOLEAN",
            ParamType::Array => "ARRAY",
            ParamType::Date => "DATE",
            ParamType::TimeRange => "TIMERANGE",
        };
        f.write_str(text)
    }
}

// ============================================================================
// PARAMETER DEFINITION
// ============================================================================

/// One query parameter expected at a path pattern.
///
/// Definitions are case-insensitive, optional and unrestricted unless the
/// builder methods say otherwise:
///
/// ```
/// use lexis_core::{ParamDefinition, ParamType};
///
/// let def = ParamDefinition::new("include", ParamType::Array)
///     .allowed(["roots", "verses"]);
/// assert!(!def.is_mandatory());
/// assert!(!def.is_case_sensitive());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDefinition {
    name: String,
    #[serde(rename = "type")]
    param_type: ParamType,
    #[serde(default)]
    is_mandatory: bool,
    #[serde(default)]
    case_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    allowed_values: Option<Vec<String>>,
}

impl ParamDefinition {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            is_mandatory: false,
            case_sensitive: false,
            allowed_values: None,
        }
    }

    /// Reject requests that omit this parameter.
    pub fn mandatory(mut self) -> Self {
        self.is_mandatory = true;
        self
    }

    /// Compare the raw value and the allow-list without case folding.
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Restrict the value (or, for arrays, every element) to these literals.
    pub fn allowed<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn is_mandatory(&self) -> bool {
        self.is_mandatory
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn allowed_values(&self) -> Option<&[String]> {
        self.allowed_values.as_deref()
    }
}

// ============================================================================
// TYPED VALUES
// ============================================================================

/// A query parameter value after validation and coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    String(String),
    Number(i64),
    Float(f64),
    Boolean(bool),
    Array(Vec<String>),
    Date(DateTime<Utc>),
    TimeRange(DateTime<Utc>, DateTime<Utc>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            ParamValue::Date(at) => Some(*at),
            _ => None,
        }
    }

    pub fn as_time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            ParamValue::TimeRange(start, end) => Some((*start, *end)),
            _ => None,
        }
    }
}

/// Extracted parameters, in definition order.
///
/// Parameters that were optional and not provided are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: &str, value: ParamValue) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl Serialize for ParamMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_defaults() {
        let def = ParamDefinition::new("q", ParamType::String);
        assert_eq!(def.name(), "q");
        assert!(!def.is_mandatory());
        assert!(!def.is_case_sensitive());
        assert!(def.allowed_values().is_none());
    }

    #[test]
    fn test_definition_builder() {
        let def = ParamDefinition::new("lang", ParamType::String)
            .mandatory()
            .case_sensitive()
            .allowed(["heb", "grc"]);
        assert!(def.is_mandatory());
        assert!(def.is_case_sensitive());
        assert_eq!(def.allowed_values(), Some(&["heb".to_string(), "grc".to_string()][..]));
    }

    #[test]
    fn test_definition_deserializes_with_defaults() {
        let def: ParamDefinition =
            serde_json::from_str(r#"{"name":"limit","type":"NUMBER"}"#).unwrap();
        assert_eq!(def.param_type(), ParamType::Number);
        assert!(!def.is_mandatory());
    }

    #[test]
    fn test_param_map_serializes_in_order() {
        let mut map = ParamMap::new();
        map.insert("b", ParamValue::Number(2));
        map.insert("a", ParamValue::Array(vec!["x".to_string()]));
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"b":2,"a":["x"]}"#);
    }

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Number(5).as_i64(), Some(5));
        assert_eq!(ParamValue::Boolean(true).as_bool(), Some(true));
        assert!(ParamValue::String("x".into()).as_i64().is_none());
    }
}
