//! Payment state machine rules.
//!
//! Receipt gating is checked before status for approve and complete, so a
//! missing or unverified receipt always surfaces as a precondition failure
//! whatever state the payment is in.

use rust_decimal::Decimal;

use super::types::{Payment, PaymentReceipt, PaymentStatus};
use crate::error::WorkflowError;

const PAYMENT: &str = "Payment";
const RECEIPT: &str = "PaymentReceipt";

/// Stateless service for payment lifecycle rules.
pub struct PaymentService;

impl PaymentService {
    /// Validates a new payment's amount and payer.
    pub fn validate_create(user_id: &str, amount: Decimal) -> Result<(), WorkflowError> {
        if user_id.trim().is_empty() {
            return Err(WorkflowError::validation("user id is required"));
        }
        if amount <= Decimal::ZERO {
            return Err(WorkflowError::validation("amount must be greater than zero"));
        }
        Ok(())
    }

    /// Checks that a receipt exists and is verified.
    ///
    /// # Returns
    /// * `Err(WorkflowError::Precondition)` if absent or unverified
    pub fn ensure_verified_receipt(
        payment: &Payment,
        receipt: Option<&PaymentReceipt>,
    ) -> Result<(), WorkflowError> {
        match receipt {
            None => Err(WorkflowError::precondition(format!(
                "payment {} has no receipt",
                payment.id
            ))),
            Some(receipt) if !receipt.is_verified => Err(WorkflowError::precondition(format!(
                "receipt {} for payment {} is not verified",
                receipt.id, payment.id
            ))),
            Some(_) => Ok(()),
        }
    }

    /// Accept a (re)uploaded receipt.
    ///
    /// A new receipt starts unverified, so an approval it was based on no
    /// longer holds and an Approved payment returns to Pending.
    ///
    /// # Returns
    /// * `Ok(PaymentStatus::Pending)` from Pending or Approved, and from
    ///   Rejected when `allow_after_rejection` is set
    /// * `Err(WorkflowError::InvalidState)` from Completed, or from Rejected
    ///   when re-upload after rejection is disabled
    pub fn upload_receipt(
        payment: &Payment,
        allow_after_rejection: bool,
    ) -> Result<PaymentStatus, WorkflowError> {
        match payment.status {
            PaymentStatus::Pending | PaymentStatus::Approved => Ok(PaymentStatus::Pending),
            PaymentStatus::Rejected if allow_after_rejection => Ok(PaymentStatus::Pending),
            actual => {
                let expected = if allow_after_rejection {
                    "pending, approved or rejected"
                } else {
                    "pending or approved"
                };
                Err(WorkflowError::invalid_state(
                    PAYMENT, payment.id, expected, actual,
                ))
            }
        }
    }

    /// Mark a receipt verified.
    ///
    /// # Returns
    /// * `Err(WorkflowError::Precondition)` if there is no receipt
    /// * `Err(WorkflowError::InvalidState)` if the payment is not Pending or
    ///   the receipt is already verified
    pub fn verify_receipt(
        payment: &Payment,
        receipt: Option<&PaymentReceipt>,
    ) -> Result<(), WorkflowError> {
        let Some(receipt) = receipt else {
            return Err(WorkflowError::precondition(format!(
                "payment {} has no receipt",
                payment.id
            )));
        };

        if payment.status != PaymentStatus::Pending {
            return Err(WorkflowError::invalid_state(
                PAYMENT,
                payment.id,
                PaymentStatus::Pending,
                payment.status,
            ));
        }

        if receipt.is_verified {
            return Err(WorkflowError::invalid_state(
                RECEIPT,
                receipt.id,
                "unverified",
                "verified",
            ));
        }

        Ok(())
    }

    /// Approve a pending payment with a verified receipt.
    ///
    /// # Returns
    /// * `Ok(PaymentStatus::Approved)` if the transition is valid
    /// * `Err(WorkflowError::Precondition)` if the receipt is missing or
    ///   unverified
    /// * `Err(WorkflowError::InvalidState)` if not in Pending status
    pub fn approve(
        payment: &Payment,
        receipt: Option<&PaymentReceipt>,
    ) -> Result<PaymentStatus, WorkflowError> {
        Self::ensure_verified_receipt(payment, receipt)?;
        Self::transition(payment, PaymentStatus::Pending, PaymentStatus::Approved)
    }

    /// Reject a pending payment.
    ///
    /// # Returns
    /// * `Ok(PaymentStatus::Rejected)` if the transition is valid
    /// * `Err(WorkflowError::InvalidState)` if not in Pending status
    pub fn reject(payment: &Payment) -> Result<PaymentStatus, WorkflowError> {
        Self::transition(payment, PaymentStatus::Pending, PaymentStatus::Rejected)
    }

    /// Complete an approved payment with a verified receipt.
    ///
    /// # Returns
    /// * `Ok(PaymentStatus::Completed)` if the transition is valid
    /// * `Err(WorkflowError::Precondition)` if the receipt is missing or
    ///   unverified
    /// * `Err(WorkflowError::InvalidState)` if not in Approved status
    pub fn complete(
        payment: &Payment,
        receipt: Option<&PaymentReceipt>,
    ) -> Result<PaymentStatus, WorkflowError> {
        Self::ensure_verified_receipt(payment, receipt)?;
        Self::transition(payment, PaymentStatus::Approved, PaymentStatus::Completed)
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Approved
    /// - Pending → Rejected
    /// - Approved → Completed
    /// - Approved → Pending (re-upload)
    /// - Rejected → Pending (re-upload)
    #[must_use]
    pub fn is_valid_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
        matches!(
            (from, to),
            (
                PaymentStatus::Pending,
                PaymentStatus::Approved | PaymentStatus::Rejected
            ) | (
                PaymentStatus::Approved,
                PaymentStatus::Completed | PaymentStatus::Pending
            ) | (PaymentStatus::Rejected, PaymentStatus::Pending)
        )
    }

    fn transition(
        payment: &Payment,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<PaymentStatus, WorkflowError> {
        if payment.status == from {
            Ok(to)
        } else {
            Err(WorkflowError::invalid_state(
                PAYMENT,
                payment.id,
                from,
                payment.status,
            ))
        }
    }
}
