//! Property-based tests for the security primitives.

use proptest::prelude::*;

use super::{SecurityService, hash_password, verify_password};

fn service() -> SecurityService {
    SecurityService::from_bytes(&[42u8; 32]).expect("32-byte key")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Decrypting an encryption returns the original text.
    #[test]
    fn prop_encrypt_round_trip(plaintext in any::<String>()) {
        let svc = service();
        let encrypted = svc.encrypt(&plaintext);
        prop_assert_eq!(svc.decrypt(&encrypted).unwrap(), plaintext);
    }

    /// Ciphertext length is the IV plus the PKCS7-padded plaintext.
    #[test]
    fn prop_ciphertext_is_padded(plaintext in ".{0,64}") {
        use base64::Engine as _;

        let encrypted = service().encrypt(&plaintext);
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encrypted.as_str())
            .unwrap();
        let padded = (plaintext.len() / 16 + 1) * 16;
        prop_assert_eq!(bytes.len(), 16 + padded);
    }
}

proptest! {
    // PBKDF2 is deliberately slow
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// A hash verifies its own password and rejects any other.
    #[test]
    fn prop_password_verifies_only_itself(
        password in "[ -~]{1,32}",
        wrong in "[ -~]{1,32}",
    ) {
        prop_assume!(password != wrong);
        let hash = hash_password(&password);
        prop_assert!(verify_password(&hash, &password));
        prop_assert!(!verify_password(&hash, &wrong));
    }

    /// Arbitrary strings never verify and never panic.
    #[test]
    fn prop_garbage_hash_is_false(hash in any::<String>(), password in any::<String>()) {
        prop_assert!(!verify_password(&hash, &password));
    }
}
