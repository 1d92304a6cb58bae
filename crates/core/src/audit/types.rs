//! Audit ledger entry types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandas_shared::Actor;
use tandas_shared::types::AuditLogId;

/// Action names written to the ledger.
pub mod actions {
    /// Record inserted.
    pub const CREATED: &str = "Created";
    /// Record updated.
    pub const MODIFIED: &str = "Modified";
    /// Record soft-deleted.
    pub const SOFT_DELETED: &str = "SoftDeleted";

    /// `TandaWorkflow::create_tanda`
    pub const CREATE_TANDA: &str = "CreateTanda";
    /// `TandaWorkflow::add_participant`
    pub const ADD_PARTICIPANT: &str = "AddParticipant";
    /// `TandaWorkflow::remove_participant`
    pub const REMOVE_PARTICIPANT: &str = "RemoveParticipant";
    /// `TandaWorkflow::activate_tanda`
    pub const ACTIVATE_TANDA: &str = "ActivateTanda";
    /// `TandaWorkflow::cancel_tanda`
    pub const CANCEL_TANDA: &str = "CancelTanda";
    /// `TandaWorkflow::complete_tanda`
    pub const COMPLETE_TANDA: &str = "CompleteTanda";
    /// `TandaWorkflow::delete_tanda`
    pub const DELETE_TANDA: &str = "DeleteTanda";

    /// `PaymentWorkflow::create_payment`
    pub const CREATE_PAYMENT: &str = "CreatePayment";
    /// `PaymentWorkflow::upload_receipt`
    pub const UPLOAD_RECEIPT: &str = "UploadReceipt";
    /// `PaymentWorkflow::verify_receipt`
    pub const VERIFY_RECEIPT: &str = "VerifyReceipt";
    /// `PaymentWorkflow::approve_payment`
    pub const APPROVE_PAYMENT: &str = "ApprovePayment";
    /// `PaymentWorkflow::reject_payment`
    pub const REJECT_PAYMENT: &str = "RejectPayment";
    /// `PaymentWorkflow::complete_payment`
    pub const COMPLETE_PAYMENT: &str = "CompletePayment";

    /// `ProfileWorkflow::create_profile`
    pub const CREATE_PROFILE: &str = "CreateProfile";
    /// `ProfileWorkflow::update_sensitive_fields`
    pub const UPDATE_PROFILE: &str = "UpdateProfile";
    /// `ProfileWorkflow::delete_profile`
    pub const DELETE_PROFILE: &str = "DeleteProfile";
}

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine change.
    Info,
    /// Destructive or negative outcome (delete, rejection, cancellation).
    Warning,
    /// Security-relevant event.
    Critical,
}

impl AuditSeverity {
    /// Returns the string representation of the severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Entry id.
    pub id: AuditLogId,
    /// Acting user, `None` for the system.
    pub actor_user_id: Option<String>,
    /// Free-form verb, see [`actions`].
    pub action: String,
    /// Entity type name.
    pub entity_type: String,
    /// Entity id.
    pub entity_id: String,
    /// Severity.
    pub severity: AuditSeverity,
    /// Server-assigned time.
    pub timestamp: DateTime<Utc>,
    /// Context such as a rejection reason.
    pub details: Option<String>,
}

impl AuditLog {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        actor: &Actor,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl fmt::Display,
        severity: AuditSeverity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            actor_user_id: actor.user_id().map(str::to_string),
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            severity,
            timestamp,
            details: None,
        }
    }

    /// Attaches context to the entry.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// The actor that produced this entry.
    #[must_use]
    pub fn actor(&self) -> Actor {
        Actor::from_stored(self.actor_user_id.as_deref())
    }
}
