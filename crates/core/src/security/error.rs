//! Crypto error types.

use thiserror::Error;

/// Errors raised by the security primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// No encryption key was configured.
    #[error("encryption key is missing")]
    MissingKey,

    /// The configured key has the wrong size.
    #[error("encryption key must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key size in bytes.
        expected: usize,
        /// Size of the key that was supplied.
        actual: usize,
    },

    /// Input was not valid base64.
    #[error("invalid base64 input")]
    InvalidBase64,

    /// Ciphertext envelope is too short or not block aligned.
    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Padding check failed, usually a wrong key or tampered data.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Decrypted bytes are not UTF-8.
    #[error("decrypted data is not valid UTF-8")]
    InvalidUtf8,
}

impl CryptoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingKey | Self::InvalidKeyLength { .. } => "ENCRYPTION_KEY_INVALID",
            Self::InvalidBase64 | Self::MalformedCiphertext(_) => "MALFORMED_CIPHERTEXT",
            Self::DecryptionFailed | Self::InvalidUtf8 => "DECRYPTION_FAILED",
        }
    }
}
