//! Error types for restock-docstore.

use thiserror::Error;

use restock_core::IdentifierError;

/// Outcome of a failed document-store call.
///
/// `NotFound` is an expected answer, not a fault. `Transient` covers network
/// and service-side failures that may succeed on retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocError {
    #[error("document not found: {path}")]
    NotFound { path: String },

    #[error("document already exists: {path}")]
    AlreadyExists { path: String },

    #[error("document store unavailable: {0}")]
    Transient(String),

    #[error("document store authentication failed: {0}")]
    Auth(String),

    /// The service understood the request and refused it (bad field, etc.).
    #[error("document store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed document {path}: {reason}")]
    Decode { path: String, reason: String },

    /// Refused before any request was made.
    #[error(transparent)]
    InvalidId(#[from] IdentifierError),
}

impl DocError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocError::NotFound { .. })
    }

    /// Worth retrying later without any change on our side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DocError::Transient(_))
    }
}

impl From<reqwest::Error> for DocError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DocError::Decode {
                path: err.url().map(|u| u.path().to_string()).unwrap_or_default(),
                reason: err.to_string(),
            }
        } else {
            DocError::Transient(err.to_string())
        }
    }
}
