//! Member profile types.

use serde::{Deserialize, Serialize};
use tandas_shared::types::ProfileId;

use crate::persistence::AuditStamp;
use crate::security::Encrypted;

/// A member's identity record.
///
/// The tax id, national id and bank account number exist only as
/// ciphertext. Reading them back goes through
/// [`ProfileWorkflow::reveal_profile`](super::ProfileWorkflow::reveal_profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Profile id.
    pub id: ProfileId,
    /// Owning user. Unique among visible profiles.
    pub user_id: String,
    /// Display name.
    pub full_name: String,
    /// Encrypted tax id.
    pub tax_id: Option<Encrypted>,
    /// Encrypted national id.
    pub national_id: Option<Encrypted>,
    /// Encrypted bank account number.
    pub account_number: Option<Encrypted>,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl Profile {
    pub(crate) fn new(user_id: String, full_name: String, sensitive: EncryptedFields) -> Self {
        Self {
            id: ProfileId::new(),
            user_id,
            full_name,
            tax_id: sensitive.tax_id,
            national_id: sensitive.national_id,
            account_number: sensitive.account_number,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }
}

/// Plaintext sensitive fields, as supplied by or revealed to a caller.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SensitiveFields {
    /// Tax id.
    pub tax_id: Option<String>,
    /// National id.
    pub national_id: Option<String>,
    /// Bank account number.
    pub account_number: Option<String>,
}

impl std::fmt::Debug for SensitiveFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SensitiveFields")
            .field("tax_id", &mask(&self.tax_id))
            .field("national_id", &mask(&self.national_id))
            .field("account_number", &mask(&self.account_number))
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct EncryptedFields {
    pub(crate) tax_id: Option<Encrypted>,
    pub(crate) national_id: Option<Encrypted>,
    pub(crate) account_number: Option<Encrypted>,
}

/// Request to create a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfileRequest {
    /// Owning user.
    pub user_id: String,
    /// Display name.
    pub full_name: String,
    /// Plaintext sensitive fields. Encrypted before staging.
    #[serde(default)]
    pub sensitive: SensitiveFields,
}

/// Decrypted view of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    /// Profile id.
    pub id: ProfileId,
    /// Owning user.
    pub user_id: String,
    /// Display name.
    pub full_name: String,
    /// Decrypted sensitive fields.
    pub sensitive: SensitiveFields,
}
