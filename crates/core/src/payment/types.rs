//! Payment domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tandas_shared::types::{PaymentId, ReceiptId, TandaId};

use crate::persistence::{AuditStamp, Auditable};

/// Payment lifecycle status.
///
/// The valid transitions are:
/// - Pending → Approved (approve)
/// - Approved → Completed (complete)
/// - Pending → Rejected (reject)
/// - Rejected → Pending (receipt re-upload, when policy allows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Waiting for a verified receipt and approval.
    Pending,
    /// Approved by an administrator.
    Approved,
    /// Paid; the matching turn is marked paid out.
    Completed,
    /// Refused by an administrator.
    Rejected,
}

impl PaymentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contribution into a tanda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: PaymentId,
    /// Tanda paid into.
    pub tanda_id: TandaId,
    /// Paying user.
    pub user_id: String,
    /// Amount paid.
    pub amount: Decimal,
    /// Lifecycle status.
    pub status: PaymentStatus,
    /// Set when approved.
    pub approved_at: Option<DateTime<Utc>>,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl Payment {
    pub(crate) fn pending(tanda_id: TandaId, user_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: PaymentId::new(),
            tanda_id,
            user_id: user_id.into(),
            amount,
            status: PaymentStatus::Pending,
            approved_at: None,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }

    /// When the payment was committed.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.audit().created_at()
    }
}

/// Proof of payment attached to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// Receipt id.
    pub id: ReceiptId,
    /// Owning payment.
    pub payment_id: PaymentId,
    /// Locator returned by the blob store.
    pub storage_uri: Option<String>,
    /// Legacy locator, used when `storage_uri` is absent.
    pub file_path: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Set by the verification step; gates approval and completion.
    pub is_verified: bool,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl PaymentReceipt {
    pub(crate) fn uploaded(
        payment_id: PaymentId,
        storage_uri: String,
        uploaded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ReceiptId::new(),
            payment_id,
            file_path: storage_uri.clone(),
            storage_uri: Some(storage_uri),
            uploaded_at,
            is_verified: false,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }

    /// Blob locator, falling back to the legacy file path.
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        self.storage_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .or_else(|| Some(self.file_path.as_str()).filter(|path| !path.is_empty()))
    }
}

/// Request to create a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    /// Tanda paid into.
    pub tanda_id: TandaId,
    /// Paying user.
    pub user_id: String,
    /// Amount paid. Must be positive.
    pub amount: Decimal,
}

/// Row of `list_pending_payments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingPaymentItem {
    /// Payment id.
    pub id: PaymentId,
    /// Name of the tanda, empty if it is no longer visible.
    pub tanda_name: String,
    /// Paying user.
    pub user_id: String,
    /// Amount paid.
    pub amount: Decimal,
    /// Receipt locator, if a receipt was uploaded.
    pub receipt_uri: Option<String>,
}

/// Payment with its current receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentDetail {
    /// The payment.
    pub payment: Payment,
    /// Current visible receipt.
    pub receipt: Option<PaymentReceipt>,
}
