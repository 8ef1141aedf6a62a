//! Errors reported by external collaborators
//!
//! The persistence store, the quota service and the external schema API are
//! implemented outside the core. Their failures are funnelled through the
//! types below so callers can tell infrastructure problems apart from
//! domain conditions such as a reached canvas limit.

use thiserror::Error;

/// Persistence collaborator errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Canvas not found for the owner
    #[error("Canvas '{canvas_id}' not found for owner '{owner_key}'")]
    NotFound {
        owner_key: String,
        canvas_id: String,
    },

    /// Filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend rejected or failed the operation
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Quota collaborator errors
#[derive(Error, Debug)]
pub enum QuotaError {
    /// Owner is unknown to the quota service
    #[error("Unknown owner '{0}'")]
    UnknownOwner(String),

    /// Quota backend failure
    #[error("Quota backend error: {0}")]
    Backend(String),
}

/// External schema API errors
#[derive(Error, Debug, Clone)]
pub enum ExternalApiError {
    /// The API refused the request
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The API is rate limiting the caller
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Transport or unexpected failure
    #[error("External API unavailable: {0}")]
    Unavailable(String),
}

impl ExternalApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ExternalApiError::Rejected { .. } => "REJECTED",
            ExternalApiError::RateLimited(_) => "RATE_LIMITED",
            ExternalApiError::Unavailable(_) => "UNAVAILABLE",
        }
    }
}
