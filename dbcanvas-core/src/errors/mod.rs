//! Domain-specific error types for dbcanvas-core
//!
//! # Error Categories
//!
//! - **SchemaError**: lookups and canvas document (de)serialization
//! - **LinkError**: dual relation pairing and cascade removal
//! - **DuplicationError**: quota-gated canvas duplication
//! - **StoreError / QuotaError / ExternalApiError**: failures reported by collaborators
//!
//! Graph invariant violations are deliberately not errors; see
//! [`crate::schema::validate`]. Export failures never surface as errors either:
//! they are aggregated into [`crate::export::ExportResult`].

pub mod collaborator;
pub mod duplication;
pub mod link;
pub mod schema;

pub use collaborator::{ExternalApiError, QuotaError, StoreError};
pub use duplication::DuplicationError;
pub use link::LinkError;
pub use schema::SchemaError;

/// Result type alias for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type alias for relation linking
pub type LinkResult<T> = Result<T, LinkError>;

/// Result type alias for duplication
pub type DuplicationResult<T> = Result<T, DuplicationError>;

/// Result type alias for persistence collaborators
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for quota collaborators
pub type QuotaResult<T> = Result<T, QuotaError>;

/// Result type alias for external API collaborators
pub type ExternalApiResult<T> = Result<T, ExternalApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_result_alias() {
        let result: SchemaResult<i32> = Err(SchemaError::DatabaseNotFound("db".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_link_result_alias() {
        let result: LinkResult<()> = Err(LinkError::SelfPair("prop".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_duplication_result_alias() {
        let result: DuplicationResult<()> =
            Err(DuplicationError::LimitReached { count: 3, limit: 3 });
        assert!(result.is_err());
    }
}
