//! Workflow error taxonomy.
//!
//! Every tanda, payment and profile operation returns [`WorkflowError`].
//! Blob and record-store failures arrive as [`StorageError`] and crypto
//! failures as [`CryptoError`]; neither leaks a raw backend error.

use std::fmt::Display;

use thiserror::Error;

use crate::security::CryptoError;
use crate::storage::StorageError;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Bad input, e.g. a non-positive participant count.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced entity is absent or soft-deleted.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity type name.
        entity: &'static str,
        /// Entity id.
        id: String,
    },

    /// Operation not permitted from the entity's current state.
    #[error("{entity} {id} is {actual}, expected {expected}")]
    InvalidState {
        /// Entity type name.
        entity: &'static str,
        /// Entity id.
        id: String,
        /// State(s) the operation requires.
        expected: String,
        /// State the entity is in.
        actual: String,
    },

    /// A gating condition does not hold, e.g. an unverified receipt.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Blob or record-store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed hash or cipher input, or a missing key.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl WorkflowError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Create an invalid state error.
    #[must_use]
    pub fn invalid_state(
        entity: &'static str,
        id: impl Display,
        expected: impl Display,
        actual: impl Display,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a precondition error.
    #[must_use]
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::InvalidState { .. } => 409,
            Self::Precondition(_) => 422,
            Self::Storage(err) => err.status_code(),
            Self::Crypto(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Precondition(_) => "PRECONDITION_FAILED",
            Self::Storage(err) => err.error_code(),
            Self::Crypto(err) => err.error_code(),
        }
    }
}
