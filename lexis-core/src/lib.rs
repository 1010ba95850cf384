//! LEXIS Core - Query Parameter Schema
//!
//! Declarative description of the query parameters each request path
//! accepts, the segment-wise matcher that finds them, and the validator that
//! turns raw query strings into typed values.
//!
//! Everything here is pure and reentrant: a [`ParamRegistry`] is built once
//! at startup and shared by all in-flight requests.

pub mod error;
pub mod params;

pub use error::{ParamError, ParamResult, Rejection, SchemaError};
pub use params::{
    extract, is_iso_date, parse_iso_date, ParamDefinition, ParamMap, ParamRegistry, ParamType,
    ParamValue, PathPattern,
};
