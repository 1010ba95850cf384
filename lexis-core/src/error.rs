//! Error types for parameter schema construction and query extraction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a query parameter was rejected.
///
/// Carried alongside [`ParamError::InvalidParameter`] for logging. Callers
/// map every variant to the same client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// The key is not declared for the request path.
    Unrecognized,
    /// The key appears more than once in the query string.
    Duplicate,
    /// A mandatory parameter is absent.
    Missing,
    /// The parameter is present with an empty value.
    Empty,
    /// The value does not have the shape its type requires.
    WrongType,
    /// The value (or one of its elements) is not in the allow-list.
    NotAllowed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Rejection::Unrecognized => "unrecognized",
            Rejection::Duplicate => "duplicate",
            Rejection::Missing => "missing",
            Rejection::Empty => "empty",
            Rejection::WrongType => "wrong type",
            Rejection::NotAllowed => "value not allowed",
        };
        f.write_str(text)
    }
}

/// Failure to extract typed query parameters from a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// A single offending parameter, reported fail-fast.
    #[error("Invalid or missing query param {name}")]
    InvalidParameter {
        /// Name of the offending parameter (or unrecognized key).
        name: String,
        /// Which check rejected it.
        reason: Rejection,
    },
}

impl ParamError {
    pub(crate) fn invalid(name: impl Into<String>, reason: Rejection) -> Self {
        ParamError::InvalidParameter {
            name: name.into(),
            reason,
        }
    }

    /// Name of the offending parameter.
    pub fn name(&self) -> &str {
        match self {
            ParamError::InvalidParameter { name, .. } => name,
        }
    }

    /// The check that rejected the parameter.
    pub fn reason(&self) -> Rejection {
        match self {
            ParamError::InvalidParameter { reason, .. } => *reason,
        }
    }
}

/// Errors raised while building a [`crate::ParamRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("path pattern '{pattern}' must start with '/'")]
    InvalidPattern { pattern: String },

    #[error("parameter '{name}' declared twice for path pattern '{pattern}'")]
    DuplicateParam { pattern: String, name: String },
}

/// Result alias for parameter extraction.
pub type ParamResult<T> = Result<T, ParamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display_names_param() {
        let err = ParamError::invalid("lang", Rejection::NotAllowed);
        assert_eq!(err.to_string(), "Invalid or missing query param lang");
        assert_eq!(err.name(), "lang");
        assert_eq!(err.reason(), Rejection::NotAllowed);
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::DuplicateParam {
            pattern: "/words/*/*".to_string(),
            name: "fields".to_string(),
        };
        assert!(err.to_string().contains("fields"));
        assert!(err.to_string().contains("/words/*/*"));
    }
}
