//! AES-256-CBC field encryption.

use std::fmt;

use aes::Aes256;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tandas_shared::config::EncryptionConfig;

use super::error::CryptoError;
use super::password;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// Ciphertext produced by [`SecurityService::encrypt`].
///
/// Sensitive fields are typed as `Encrypted` so plaintext cannot be stored
/// in them by accident. The inner value is the base64 `IV ‖ ciphertext`
/// envelope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encrypted(String);

impl Encrypted {
    /// Wraps a stored envelope without checking it.
    #[must_use]
    pub fn from_stored(envelope: impl Into<String>) -> Self {
        Self(envelope.into())
    }

    /// Returns the base64 envelope.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Encrypted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Encrypted").field(&"<ciphertext>").finish()
    }
}

/// Security service holding the field-encryption key.
///
/// Built once at startup. Construction fails when the key is absent or does
/// not decode to exactly 32 bytes, so a misconfigured process never starts.
#[derive(Clone)]
pub struct SecurityService {
    key: [u8; KEY_LEN],
}

impl SecurityService {
    /// Creates a service from a base64-encoded key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MissingKey`] for an empty key,
    /// [`CryptoError::InvalidBase64`] if it does not decode, and
    /// [`CryptoError::InvalidKeyLength`] if it is not 32 bytes.
    pub fn new(key_b64: &str) -> Result<Self, CryptoError> {
        let key_b64 = key_b64.trim();
        if key_b64.is_empty() {
            return Err(CryptoError::MissingKey);
        }

        let raw = STANDARD
            .decode(key_b64)
            .map_err(|_| CryptoError::InvalidBase64)?;

        Self::from_bytes(&raw)
    }

    /// Creates a service from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if `raw` is not 32 bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = raw.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: raw.len(),
        })?;

        Ok(Self { key })
    }

    /// Creates a service from application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`SecurityService::new`].
    pub fn from_config(config: &EncryptionConfig) -> Result<Self, CryptoError> {
        Self::new(&config.key)
    }

    /// Encrypts a string with a fresh random IV.
    #[must_use]
    pub fn encrypt(&self, plaintext: &str) -> Encrypted {
        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut envelope = Vec::with_capacity(IV_LEN + ciphertext.len());
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ciphertext);

        Encrypted(STANDARD.encode(envelope))
    }

    /// Decrypts an envelope produced by [`SecurityService::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns a [`CryptoError`] for bad base64, a truncated or unaligned
    /// envelope, a padding failure, or non-UTF-8 plaintext.
    pub fn decrypt(&self, encrypted: &Encrypted) -> Result<String, CryptoError> {
        let bytes = STANDARD
            .decode(encrypted.as_str())
            .map_err(|_| CryptoError::InvalidBase64)?;

        if bytes.len() < IV_LEN + BLOCK_LEN {
            return Err(CryptoError::MalformedCiphertext(format!(
                "expected at least {} bytes, got {}",
                IV_LEN + BLOCK_LEN,
                bytes.len()
            )));
        }

        let (iv, ciphertext) = bytes.split_at(IV_LEN);
        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(CryptoError::MalformedCiphertext(
                "ciphertext is not block aligned".to_string(),
            ));
        }

        let plaintext = Aes256CbcDec::new_from_slices(&self.key, iv)
            .map_err(|_| CryptoError::MalformedCiphertext("invalid IV".to_string()))?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Encrypts an optional field.
    #[must_use]
    pub fn encrypt_opt(&self, plaintext: Option<&str>) -> Option<Encrypted> {
        plaintext.map(|value| self.encrypt(value))
    }

    /// Decrypts an optional field.
    ///
    /// # Errors
    ///
    /// Same as [`SecurityService::decrypt`].
    pub fn decrypt_opt(&self, encrypted: Option<&Encrypted>) -> Result<Option<String>, CryptoError> {
        encrypted.map(|value| self.decrypt(value)).transpose()
    }

    /// Hashes a password. See [`hash_password`](crate::security::hash_password).
    #[must_use]
    pub fn hash_password(&self, password: &str) -> String {
        password::hash_password(password)
    }

    /// Verifies a password. See [`verify_password`](crate::security::verify_password).
    #[must_use]
    pub fn verify_password(&self, hash: &str, password: &str) -> bool {
        password::verify_password(hash, password)
    }
}

impl fmt::Debug for SecurityService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityService")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    fn service() -> SecurityService {
        SecurityService::new(KEY).expect("valid key")
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let encrypted = svc.encrypt("RFC ABCD010101XYZ");
        assert_ne!(encrypted.as_str(), "RFC ABCD010101XYZ");
        assert_eq!(svc.decrypt(&encrypted).unwrap(), "RFC ABCD010101XYZ");
    }

    #[test]
    fn test_envelope_layout() {
        let encrypted = service().encrypt("abc");
        let bytes = STANDARD.decode(encrypted.as_str()).unwrap();
        // IV plus one padded block
        assert_eq!(bytes.len(), IV_LEN + BLOCK_LEN);
    }

    #[test]
    fn test_random_iv_per_call() {
        let svc = service();
        assert_ne!(svc.encrypt("same"), svc.encrypt("same"));
    }

    #[test]
    fn test_empty_string() {
        let svc = service();
        assert_eq!(svc.decrypt(&svc.encrypt("")).unwrap(), "");
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(SecurityService::new("").unwrap_err(), CryptoError::MissingKey);
        assert_eq!(
            SecurityService::new("   ").unwrap_err(),
            CryptoError::MissingKey
        );
    }

    #[test]
    fn test_wrong_key_length() {
        let short = STANDARD.encode([7u8; 16]);
        assert_eq!(
            SecurityService::new(&short).unwrap_err(),
            CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            }
        );
    }

    #[test]
    fn test_key_not_base64() {
        assert_eq!(
            SecurityService::new("not base64!").unwrap_err(),
            CryptoError::InvalidBase64
        );
    }

    #[test]
    fn test_from_config() {
        let config = EncryptionConfig {
            key: KEY.to_string(),
        };
        assert!(SecurityService::from_config(&config).is_ok());
    }

    #[test]
    fn test_malformed_ciphertext() {
        let svc = service();
        assert_eq!(
            svc.decrypt(&Encrypted::from_stored("%%%")).unwrap_err(),
            CryptoError::InvalidBase64
        );

        let short = Encrypted::from_stored(STANDARD.encode([0u8; 20]));
        assert!(matches!(
            svc.decrypt(&short).unwrap_err(),
            CryptoError::MalformedCiphertext(_)
        ));

        let unaligned = Encrypted::from_stored(STANDARD.encode([0u8; 40]));
        assert!(matches!(
            svc.decrypt(&unaligned).unwrap_err(),
            CryptoError::MalformedCiphertext(_)
        ));
    }

    #[test]
    fn test_wrong_key_does_not_reveal_plaintext() {
        let encrypted = service().encrypt("secret account 0001");
        let other = SecurityService::from_bytes(&[9u8; 32]).unwrap();
        assert!(
            other
                .decrypt(&encrypted)
                .map_or(true, |plain| plain != "secret account 0001")
        );
    }

    #[test]
    fn test_optional_fields() {
        let svc = service();
        assert_eq!(svc.encrypt_opt(None), None);
        let encrypted = svc.encrypt_opt(Some("x"));
        assert_eq!(
            svc.decrypt_opt(encrypted.as_ref()).unwrap(),
            Some("x".to_string())
        );
    }

    #[test]
    fn test_debug_redacts() {
        let svc = service();
        assert!(!format!("{svc:?}").contains(KEY));
        let encrypted = svc.encrypt("secret");
        assert!(!format!("{encrypted:?}").contains(encrypted.as_str()));
    }
}
