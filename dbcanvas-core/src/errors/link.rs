//! Relation linking error types

use thiserror::Error;

/// Errors raised while pairing or detaching relation properties
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Referenced property does not exist in the graph
    #[error("Property '{0}' not found")]
    PropertyNotFound(String),

    /// Referenced database does not exist in the graph
    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    /// Property is not of type `relation`
    #[error("Property '{property_id}' has type '{actual}', expected 'relation'")]
    TypeMismatch {
        /// Offending property identifier
        property_id: String,
        /// Type the property actually has
        actual: String,
    },

    /// A property cannot be paired with itself
    #[error("Property '{0}' cannot be paired with itself")]
    SelfPair(String),
}

impl LinkError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, LinkError::TypeMismatch { .. } | LinkError::SelfPair(_))
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            LinkError::PropertyNotFound(_) | LinkError::DatabaseNotFound(_) => "NOT_FOUND",
            LinkError::TypeMismatch { .. } => "TYPE_MISMATCH",
            LinkError::SelfPair(_) => "VALIDATION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch() {
        let err = LinkError::TypeMismatch {
            property_id: "prop_1".to_string(),
            actual: "title".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Property 'prop_1' has type 'title', expected 'relation'"
        );
        assert!(err.is_client_error());
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_not_found_is_not_client_error() {
        let err = LinkError::PropertyNotFound("missing".to_string());
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
