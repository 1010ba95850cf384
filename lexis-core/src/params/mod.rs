//! Query parameter schema: path patterns, definitions, validation.
//!
//! A request path resolves to the definitions of every registered pattern it
//! matches; [`extract`] then checks the raw query against those definitions
//! and produces typed values.

mod datetime;
mod registry;
mod types;
mod validate;

pub use datetime::{is_iso_date, parse_iso_date};
pub use registry::{ParamRegistry, PathPattern};
pub use types::{ParamDefinition, ParamMap, ParamType, ParamValue};
pub use validate::extract;
