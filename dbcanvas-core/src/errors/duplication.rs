//! Canvas duplication error types
//!
//! # Examples
//!
//! ```rust
//! use dbcanvas::errors::DuplicationError;
//!
//! let err = DuplicationError::LimitReached { count: 3, limit: 3 };
//! assert!(err.is_limit_reached());
//! assert_eq!(err.error_code(), "LIMIT_REACHED");
//! ```

use thiserror::Error;

use super::{QuotaError, SchemaError, StoreError};

/// Duplication workflow errors
#[derive(Error, Debug)]
pub enum DuplicationError {
    /// Owner already holds as many canvases as the plan allows
    #[error("Canvas limit reached ({count}/{limit})")]
    LimitReached { count: u32, limit: u32 },

    /// Quota lookup failed before anything was written
    #[error("Quota check failed: {0}")]
    QuotaCheckFailed(#[source] QuotaError),

    /// Cloned canvas could not be serialized
    #[error("Failed to serialize cloned canvas: {0}")]
    Serialization(#[from] SchemaError),

    /// Persistence collaborator rejected the write
    #[error("Failed to write cloned canvas: {0}")]
    WriteFailed(#[source] StoreError),

    /// Clone was written but the owner's counter could not be incremented
    #[error("Canvas counter update failed (clone removed: {compensated}): {source}")]
    CounterUpdateFailed {
        /// Whether the compensating delete removed the written clone
        compensated: bool,
        #[source]
        source: QuotaError,
    },
}

impl DuplicationError {
    pub fn is_limit_reached(&self) -> bool {
        matches!(self, DuplicationError::LimitReached { .. })
    }

    /// User-facing conditions, as opposed to infrastructure failures
    pub fn is_client_error(&self) -> bool {
        self.is_limit_reached()
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            DuplicationError::LimitReached { .. } => "LIMIT_REACHED",
            DuplicationError::QuotaCheckFailed(_) => "QUOTA_UNAVAILABLE",
            DuplicationError::Serialization(_) => "SERIALIZATION_FAILED",
            DuplicationError::WriteFailed(_) => "WRITE_FAILED",
            DuplicationError::CounterUpdateFailed { .. } => "WRITE_FAILED",
        }
    }
}
