//! Schema graph error types
//!
//! Lookup and (de)serialization failures for canvases and their schema graphs.
//! Invariant violations are not errors: `schema::validate` reports them as a
//! list of [`Violation`](crate::schema::Violation)s instead.
//!
//! # Examples
//!
//! ```rust
//! use dbcanvas::errors::SchemaError;
//!
//! let err = SchemaError::PropertyNotFound("prop_1".to_string());
//! assert!(err.is_not_found());
//! assert_eq!(err.error_code(), "NOT_FOUND");
//! ```

use thiserror::Error;

/// Schema graph errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Database not found by ID
    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    /// Property not found by ID
    #[error("Property '{0}' not found")]
    PropertyNotFound(String),

    /// Relation not found by ID
    #[error("Relation '{0}' not found")]
    RelationNotFound(String),

    /// Canvas document could not be parsed or rendered
    #[error("Invalid canvas document: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

impl SchemaError {
    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SchemaError::DatabaseNotFound(_)
                | SchemaError::PropertyNotFound(_)
                | SchemaError::RelationNotFound(_)
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            SchemaError::DatabaseNotFound(_)
            | SchemaError::PropertyNotFound(_)
            | SchemaError::RelationNotFound(_) => "NOT_FOUND",
            SchemaError::InvalidDocument(_) => "INVALID_DOCUMENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_not_found() {
        let err = SchemaError::DatabaseNotFound("db_1".to_string());
        assert_eq!(err.to_string(), "Database 'db_1' not found");
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_invalid_document() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = SchemaError::from(parse_err);
        assert!(!err.is_not_found());
        assert_eq!(err.error_code(), "INVALID_DOCUMENT");
        assert!(err.to_string().starts_with("Invalid canvas document"));
    }
}
