//! Transactional profile operations.

use tandas_shared::Actor;
use tandas_shared::types::ProfileId;
use tracing::info;

use super::types::{CreateProfileRequest, EncryptedFields, Profile, ProfileView, SensitiveFields};
use crate::audit::{AuditSeverity, actions};
use crate::error::WorkflowError;
use crate::persistence::{Record, Repository, UnitOfWork, Visibility};
use crate::security::SecurityService;

/// Profile operations. Sensitive fields are encrypted before they are
/// staged, so plaintext never reaches the store or the audit ledger.
#[derive(Debug, Clone)]
pub struct ProfileWorkflow {
    repo: Repository,
    security: SecurityService,
}

impl ProfileWorkflow {
    /// Creates the workflow.
    #[must_use]
    pub fn new(repo: Repository, security: SecurityService) -> Self {
        Self { repo, security }
    }

    /// Creates a profile. A user may have one visible profile.
    pub async fn create_profile(
        &self,
        request: CreateProfileRequest,
        actor: Actor,
    ) -> Result<ProfileId, WorkflowError> {
        let user_id = request.user_id.trim().to_string();
        let full_name = request.full_name.trim().to_string();
        if user_id.is_empty() {
            return Err(WorkflowError::validation("user id is required"));
        }
        if full_name.is_empty() {
            return Err(WorkflowError::validation("full name is required"));
        }
        let encrypted = self.encrypt_fields(&request.sensitive);

        let profile_id = self
            .repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    if find_by_user(uow, &user_id).await?.is_some() {
                        return Err(WorkflowError::validation(format!(
                            "user {user_id} already has a profile"
                        )));
                    }

                    let profile = Profile::new(user_id, full_name, encrypted);
                    let profile_id = profile.id;
                    uow.insert(profile)?;
                    uow.append_audit(
                        actions::CREATE_PROFILE,
                        Profile::KIND.as_str(),
                        profile_id,
                        AuditSeverity::Info,
                    );
                    Ok(profile_id)
                })
            })
            .await?;

        info!(profile_id = %profile_id, actor = %actor, "profile created");
        Ok(profile_id)
    }

    /// Replaces all three sensitive fields. `None` clears a field.
    pub async fn update_sensitive_fields(
        &self,
        profile_id: ProfileId,
        fields: SensitiveFields,
        actor: Actor,
    ) -> Result<(), WorkflowError> {
        let encrypted = self.encrypt_fields(&fields);

        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    let mut profile = uow.get::<Profile>(profile_id).await?;
                    profile.tax_id = encrypted.tax_id;
                    profile.national_id = encrypted.national_id;
                    profile.account_number = encrypted.account_number;

                    uow.update(profile).await?;
                    uow.append_audit(
                        actions::UPDATE_PROFILE,
                        Profile::KIND.as_str(),
                        profile_id,
                        AuditSeverity::Warning,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(profile_id = %profile_id, actor = %actor, "profile sensitive fields updated");
        Ok(())
    }

    /// Returns the user's profile with sensitive fields decrypted.
    pub async fn reveal_profile(&self, user_id: &str) -> Result<ProfileView, WorkflowError> {
        let user_id = user_id.trim().to_string();
        let profile = self
            .repo
            .read(move |uow| {
                Box::pin(async move {
                    find_by_user(uow, &user_id)
                        .await?
                        .ok_or_else(|| WorkflowError::not_found(Profile::KIND.as_str(), &user_id))
                })
            })
            .await?;

        let sensitive = SensitiveFields {
            tax_id: self.security.decrypt_opt(profile.tax_id.as_ref())?,
            national_id: self.security.decrypt_opt(profile.national_id.as_ref())?,
            account_number: self.security.decrypt_opt(profile.account_number.as_ref())?,
        };

        Ok(ProfileView {
            id: profile.id,
            user_id: profile.user_id,
            full_name: profile.full_name,
            sensitive,
        })
    }

    /// Soft-deletes a profile.
    pub async fn delete_profile(
        &self,
        profile_id: ProfileId,
        actor: Actor,
    ) -> Result<(), WorkflowError> {
        self.repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    uow.delete::<Profile>(profile_id).await?;
                    uow.append_audit(
                        actions::DELETE_PROFILE,
                        Profile::KIND.as_str(),
                        profile_id,
                        AuditSeverity::Warning,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(profile_id = %profile_id, actor = %actor, "profile deleted");
        Ok(())
    }

    fn encrypt_fields(&self, fields: &SensitiveFields) -> EncryptedFields {
        EncryptedFields {
            tax_id: self.security.encrypt_opt(fields.tax_id.as_deref()),
            national_id: self.security.encrypt_opt(fields.national_id.as_deref()),
            account_number: self.security.encrypt_opt(fields.account_number.as_deref()),
        }
    }
}

async fn find_by_user(
    uow: &mut UnitOfWork,
    user_id: &str,
) -> Result<Option<Profile>, WorkflowError> {
    Ok(uow
        .query::<Profile, _>(Visibility::Active, |p| p.user_id == user_id)
        .await?
        .into_iter()
        .next())
}
