//! Store-agnostic query model
//!
//! Queries use a Mongo-style shape (`{field: value}`, `{field: {$op: v}}`,
//! `{$or: [...]}`) parsed into a typed AST. Storage backends interpret the
//! AST; nothing here knows how records are persisted.

pub mod filter;
pub mod options;
pub mod projection;
pub mod schema;
pub mod search;

use serde_json::Value;
use thiserror::Error;

pub use filter::{Clause, Condition, Document, Pattern, Query, AND_KEY, OR_KEY};
pub use options::{FindOptions, Sort, SortOrder};
pub use projection::Projection;
pub use schema::{FieldType, Schema};
pub use search::{build_search_query, parse_js_number};

/// Errors raised while parsing caller-supplied filters and projections
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Invalid JSON in '{param}': {reason}")]
    InvalidJson { param: &'static str, reason: String },

    #[error("Query filter must be a JSON object")]
    NotAnObject,

    #[error("Unknown operator: {0}")]
    UnsupportedOperator(String),

    #[error("{0} must be a nonempty array")]
    ExpectedNonEmptyArray(String),

    #[error("Field '{0}' mixes operators with plain values")]
    MixedOperators(String),

    #[error("Invalid operand for {operator} on field '{field}'")]
    InvalidOperand { field: String, operator: String },

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Invalid regular expression option: {0}")]
    UnsupportedRegexOption(char),

    #[error("$options needs a $regex on field '{0}'")]
    OptionsWithoutRegex(String),

    #[error("Projection must be a JSON object or a string")]
    InvalidProjection,

    #[error("Invalid projection value for field '{0}'")]
    InvalidProjectionValue(String),

    #[error("Projection cannot mix inclusion and exclusion")]
    MixedProjection,
}

/// Parse a raw JSON query parameter (`filter`, `projection`).
pub fn parse_json_param(param: &'static str, raw: &str) -> Result<Value, QueryError> {
    serde_json::from_str(raw).map_err(|e| QueryError::InvalidJson {
        param,
        reason: e.to_string(),
    })
}
