//! Storage error types.
//!
//! Shared by the blob store and the transactional record store.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File size exceeds maximum allowed.
    #[error("file size {size} bytes exceeds maximum allowed {max} bytes")]
    FileTooLarge {
        /// Actual file size.
        size: u64,
        /// Maximum allowed size.
        max: u64,
    },

    /// Object not found in storage.
    #[error("object not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),

    /// Invalid storage key or locator.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A record changed after it was read in this transaction.
    #[error("write conflict on {entity} {id}")]
    Conflict {
        /// Entity type name.
        entity: String,
        /// Entity id.
        id: String,
    },

    /// Insert of a key that already exists.
    #[error("duplicate key {entity} {id}")]
    DuplicateKey {
        /// Entity type name.
        entity: String,
        /// Entity id.
        id: String,
    },

    /// A delete was requested for a record that cannot be soft-deleted.
    #[error("hard delete of {entity} {id} rejected")]
    HardDeleteRejected {
        /// Entity type name.
        entity: String,
        /// Entity id.
        id: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,
}

impl StorageError {
    /// Create a file too large error.
    #[must_use]
    pub fn file_too_large(size: u64, max: u64) -> Self {
        Self::FileTooLarge { size, max }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create a write conflict error.
    #[must_use]
    pub fn conflict(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::Conflict {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a duplicate key error.
    #[must_use]
    pub fn duplicate_key(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::DuplicateKey {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Returns true for errors a caller may retry with a fresh read.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::FileTooLarge { .. } => 413,
            Self::NotFound { .. } => 404,
            Self::InvalidKey(_) => 400,
            Self::Conflict { .. } | Self::DuplicateKey { .. } => 409,
            Self::Configuration(_)
            | Self::Operation(_)
            | Self::HardDeleteRejected { .. }
            | Self::TransactionClosed => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::FileTooLarge { .. } => "FILE_TOO_LARGE",
            Self::NotFound { .. } => "OBJECT_NOT_FOUND",
            Self::InvalidKey(_) => "INVALID_STORAGE_KEY",
            Self::Conflict { .. } => "WRITE_CONFLICT",
            Self::DuplicateKey { .. } => "DUPLICATE_KEY",
            Self::HardDeleteRejected { .. } => "HARD_DELETE_REJECTED",
            Self::Configuration(_) | Self::Operation(_) | Self::TransactionClosed => {
                "STORAGE_ERROR"
            }
        }
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}
