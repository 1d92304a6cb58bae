//! Security primitives protecting sensitive fields.
//!
//! This module provides:
//! - PBKDF2-SHA256 password hashing with a versioned envelope
//! - AES-256-CBC field encryption with a random IV per call
//!
//! Both envelopes are base64 encoded:
//!
//! ```text
//! password hash:   version(1) ‖ salt(16) ‖ derived key(32)
//! encrypted field: iv(16) ‖ ciphertext(PKCS7 padded)
//! ```

mod cipher;
mod error;
mod password;

#[cfg(test)]
mod security_props;

pub use cipher::{Encrypted, SecurityService};
pub use error::CryptoError;
pub use password::{hash_password, verify_password};
