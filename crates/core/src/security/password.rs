//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! The stored form is `base64(version ‖ salt ‖ derived_key)`. The leading
//! version byte leaves room for migrating to another algorithm later.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const VERSION: u8 = 0;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const ITERATIONS: u32 = 10_000;
const ENVELOPE_LEN: usize = 1 + SALT_LEN + KEY_LEN;

/// Hashes a password with a fresh random salt.
///
/// # Example
///
/// ```
/// use tandas_core::security::{hash_password, verify_password};
///
/// let hash = hash_password("my_secure_password");
/// assert!(verify_password(&hash, "my_secure_password"));
/// ```
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);

    let derived = derive_key(password, &salt);

    let mut envelope = Vec::with_capacity(ENVELOPE_LEN);
    envelope.push(VERSION);
    envelope.extend_from_slice(&salt);
    envelope.extend_from_slice(&derived);

    STANDARD.encode(envelope)
}

/// Verifies a password against a stored hash.
///
/// Returns `false` for a wrong password and for any malformed hash: bad
/// base64, wrong length, or an unknown version byte. The derived keys are
/// compared in constant time.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(bytes) = STANDARD.decode(hash) else {
        return false;
    };

    if bytes.len() != ENVELOPE_LEN || bytes[0] != VERSION {
        return false;
    }

    let (salt, stored) = bytes[1..].split_at(SALT_LEN);
    let computed = derive_key(password, salt);

    computed.as_slice().ct_eq(stored).into()
}

fn derive_key(password: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, ITERATIONS, &mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_envelope_layout() {
        let hash = hash_password("test_password_123!");
        let bytes = STANDARD.decode(&hash).unwrap();

        assert_eq!(bytes.len(), ENVELOPE_LEN);
        assert_eq!(bytes[0], VERSION);
        assert_ne!(hash, "test_password_123!");
    }

    #[test]
    fn test_verify_correct_password() {
        let hash = hash_password("correct_password");
        assert!(verify_password(&hash, "correct_password"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hash = hash_password("correct_password");
        assert!(!verify_password(&hash, "wrong_password"));
    }

    #[test]
    fn test_same_password_different_hashes() {
        // Random salt
        assert_ne!(hash_password("password1"), hash_password("password1"));
    }

    #[test]
    fn test_known_vector() {
        // PBKDF2-HMAC-SHA256, 10k iterations, zero salt
        let salt = [0u8; SALT_LEN];
        let derived = derive_key("password", &salt);
        let mut envelope = vec![VERSION];
        envelope.extend_from_slice(&salt);
        envelope.extend_from_slice(&derived);

        let hash = STANDARD.encode(envelope);
        assert!(verify_password(&hash, "password"));
        assert!(!verify_password(&hash, "Password"));
    }

    #[test]
    fn test_malformed_hash_is_false() {
        assert!(!verify_password("not base64 !!!", "password"));
        assert!(!verify_password("", "password"));
        assert!(!verify_password(&STANDARD.encode([0u8; 10]), "password"));
    }

    #[test]
    fn test_unknown_version_is_false() {
        let hash = hash_password("password");
        let mut bytes = STANDARD.decode(&hash).unwrap();
        bytes[0] = 1;
        assert!(!verify_password(&STANDARD.encode(bytes), "password"));
    }
}
