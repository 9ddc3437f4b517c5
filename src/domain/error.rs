//! Domain errors

use thiserror::Error;

use crate::domain::query::QueryError;

/// Domain-level error types
#[derive(Debug, Error)]
pub enum DomainError {
    /// Another record already owns the name
    #[error("{entity} name must be unique")]
    DuplicateName { entity: &'static str, name: String },

    /// No record with the given identifier
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Unparsable filter, projection or pattern supplied by the caller
    #[error("{0}")]
    MalformedInput(String),

    /// Failure reported by the underlying store
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn duplicate_name(entity: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            entity,
            name: name.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<QueryError> for DomainError {
    fn from(e: QueryError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_api_contract() {
        assert_eq!(
            DomainError::duplicate_name("City", "Tokyo").to_string(),
            "City name must be unique"
        );
        assert_eq!(
            DomainError::not_found("City", "abc").to_string(),
            "City not found"
        );
    }

    #[test]
    fn query_errors_become_malformed_input() {
        let err: DomainError = QueryError::NotAnObject.into();
        assert!(matches!(err, DomainError::MalformedInput(_)));
    }
}
