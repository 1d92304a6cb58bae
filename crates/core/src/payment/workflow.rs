//! Transactional payment operations.
//!
//! Each mutating call runs in one unit of work together with its business
//! audit entry. The payment update and the turn payout in
//! [`PaymentWorkflow::complete_payment`] commit or fail together.

use std::sync::Arc;

use bytes::Bytes;
use tandas_shared::Actor;
use tandas_shared::config::WorkflowConfig;
use tandas_shared::types::{PaymentId, ReceiptId, TurnId};
use tracing::{debug, info};

use super::service::PaymentService;
use super::types::{
    CreatePaymentRequest, Payment, PaymentDetail, PaymentReceipt, PaymentStatus,
    PendingPaymentItem,
};
use crate::audit::{AuditSeverity, actions};
use crate::error::WorkflowError;
use crate::persistence::{Record, Repository, UnitOfWork, Visibility};
use crate::storage::{BlobStore, StorageError};
use crate::tanda::{Tanda, TandaParticipant, Turn};

/// Payment lifecycle operations.
#[derive(Clone)]
pub struct PaymentWorkflow {
    repo: Repository,
    blob_store: Option<Arc<dyn BlobStore>>,
    policy: WorkflowConfig,
}

impl PaymentWorkflow {
    /// Creates the workflow without a blob store. Receipts must then be
    /// uploaded by locator.
    #[must_use]
    pub fn new(repo: Repository, policy: WorkflowConfig) -> Self {
        Self {
            repo,
            blob_store: None,
            policy,
        }
    }

    /// Attaches the blob store used by [`Self::upload_receipt_file`].
    #[must_use]
    pub fn with_blob_store(mut self, blob_store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(blob_store);
        self
    }

    /// Creates a Pending payment.
    ///
    /// Not idempotent: calling twice creates two payments.
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
        actor: Actor,
    ) -> Result<PaymentId, WorkflowError> {
        let user_id = request.user_id.trim().to_string();
        PaymentService::validate_create(&user_id, request.amount)?;
        let CreatePaymentRequest {
            tanda_id, amount, ..
        } = request;

        let payment_id = self
            .repo
            .transaction(actor.clone(), move |uow| {
                Box::pin(async move {
                    uow.get::<Tanda>(tanda_id).await?;

                    let payment = Payment::pending(tanda_id, user_id, amount);
                    let payment_id = payment.id;
                    uow.insert(payment)?;
                    uow.append_audit(
                        actions::CREATE_PAYMENT,
                        Payment::KIND.as_str(),
                        payment_id,
                        AuditSeverity::Info,
                    );
                    Ok(payment_id)
                })
            })
            .await?;

        info!(payment_id = %payment_id, tanda_id = %tanda_id, actor = %actor, "payment created");
        Ok(payment_id)
    }

    /// Attaches a receipt by locator, replacing any current one.
    ///
    /// The new receipt starts unverified and the payment goes back to
    /// Pending, dropping any earlier approval. A replaced receipt is
    /// soft-deleted.
    pub async fn upload_receipt(
        &self,
        payment_id: PaymentId,
        uploader: Actor,
        storage_uri: String,
    ) -> Result<ReceiptId, WorkflowError> {
        let storage_uri = storage_uri.trim().to_string();
        if storage_uri.is_empty() {
            return Err(WorkflowError::validation("storage uri is required"));
        }
        let allow_after_rejection = self.policy.allow_reupload_after_rejection;

        let receipt_id = self
            .repo
            .transaction(uploader.clone(), move |uow| {
                Box::pin(async move {
                    let mut payment = uow.get::<Payment>(payment_id).await?;
                    payment.status = PaymentService::upload_receipt(&payment, allow_after_rejection)?;
                    payment.approved_at = None;

                    if let Some(previous) = current_receipt(uow, payment_id).await? {
                        uow.delete::<PaymentReceipt>(previous.id).await?;
                    }

                    let receipt = PaymentReceipt::uploaded(payment_id, storage_uri, uow.now());
                    let receipt_id = receipt.id;
                    uow.insert(receipt)?;
                    uow.update(payment).await?;
                    uow.append_audit(
                        actions::UPLOAD_RECEIPT,
                        PaymentReceipt::KIND.as_str(),
                        receipt_id,
                        AuditSeverity::Info,
                    );
                    Ok(receipt_id)
                })
            })
            .await?;

        info!(
            payment_id = %payment_id,
            receipt_id = %receipt_id,
            actor = %uploader,
            "receipt uploaded"
        );
        Ok(receipt_id)
    }

    /// Stores the receipt bytes in the blob store, then attaches the
    /// returned locator.
    ///
    /// The blob is written before the transaction opens. If the transaction
    /// then fails the object stays behind unreferenced.
    pub async fn upload_receipt_file(
        &self,
        payment_id: PaymentId,
        uploader: Actor,
        bytes: Bytes,
        file_name: &str,
    ) -> Result<ReceiptId, WorkflowError> {
        let blob_store = self
            .blob_store
            .as_ref()
            .ok_or_else(|| StorageError::configuration("no blob store attached"))?;

        // Fail on a missing payment before writing anything
        let payment_id = self
            .repo
            .read(move |uow| Box::pin(async move { Ok(uow.get::<Payment>(payment_id).await?.id) }))
            .await?;

        let size = bytes.len();
        let uri = blob_store.put(bytes, file_name).await?;
        debug!(payment_id = %payment_id, uri = %uri, size, "receipt stored");

        self.upload_receipt(payment_id, uploader, uri).await
    }

    /// Marks the current receipt verified.
    pub async fn verify_receipt(
        &self,
        payment_id: PaymentId,
        verifier: Actor,
    ) -> Result<ReceiptId, WorkflowError> {
        let receipt_id = self
            .repo
            .transaction(verifier.clone(), move |uow| {
                Box::pin(async move {
                    let payment = uow.get::<Payment>(payment_id).await?;
                    let receipt = current_receipt(uow, payment_id).await?;
                    PaymentService::verify_receipt(&payment, receipt.as_ref())?;

                    let Some(mut receipt) = receipt else {
                        return Err(WorkflowError::not_found(
                            PaymentReceipt::KIND.as_str(),
                            payment_id,
                        ));
                    };
                    receipt.is_verified = true;
                    let receipt_id = receipt.id;

                    uow.update(receipt).await?;
                    uow.append_audit(
                        actions::VERIFY_RECEIPT,
                        PaymentReceipt::KIND.as_str(),
                        receipt_id,
                        AuditSeverity::Info,
                    );
                    Ok(receipt_id)
                })
            })
            .await?;

        info!(payment_id = %payment_id, receipt_id = %receipt_id, actor = %verifier, "receipt verified");
        Ok(receipt_id)
    }

    /// Approves a Pending payment whose receipt is verified.
    pub async fn approve_payment(
        &self,
        payment_id: PaymentId,
        admin: Actor,
    ) -> Result<(), WorkflowError> {
        self.repo
            .transaction(admin.clone(), move |uow| {
                Box::pin(async move {
                    let mut payment = uow.get::<Payment>(payment_id).await?;
                    let receipt = current_receipt(uow, payment_id).await?;

                    payment.status = PaymentService::approve(&payment, receipt.as_ref())?;
                    payment.approved_at = Some(uow.now());

                    uow.update(payment).await?;
                    uow.append_audit(
                        actions::APPROVE_PAYMENT,
                        Payment::KIND.as_str(),
                        payment_id,
                        AuditSeverity::Info,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(payment_id = %payment_id, actor = %admin, "payment approved");
        Ok(())
    }

    /// Rejects a Pending payment. The reason travels in the audit entry.
    pub async fn reject_payment(
        &self,
        payment_id: PaymentId,
        admin: Actor,
        reason: String,
    ) -> Result<(), WorkflowError> {
        self.repo
            .transaction(admin.clone(), move |uow| {
                Box::pin(async move {
                    let mut payment = uow.get::<Payment>(payment_id).await?;
                    payment.status = PaymentService::reject(&payment)?;

                    uow.update(payment).await?;
                    uow.append_audit_with_details(
                        actions::REJECT_PAYMENT,
                        Payment::KIND.as_str(),
                        payment_id,
                        AuditSeverity::Warning,
                        reason,
                    );
                    Ok(())
                })
            })
            .await?;

        info!(payment_id = %payment_id, actor = %admin, "payment rejected");
        Ok(())
    }

    /// Completes an Approved payment and pays out the payer's next turn.
    ///
    /// Runs as the payment's creator. Returns the turn marked paid, if the
    /// payer had an unpaid one.
    pub async fn complete_payment(
        &self,
        payment_id: PaymentId,
    ) -> Result<Option<TurnId>, WorkflowError> {
        let creator = self
            .repo
            .read(move |uow| {
                Box::pin(async move {
                    let payment = uow.get::<Payment>(payment_id).await?;
                    Ok(Actor::from_stored(payment.audit.created_by()))
                })
            })
            .await?;

        let paid_turn = self
            .repo
            .transaction(creator.clone(), move |uow| {
                Box::pin(async move {
                    let mut payment = uow.get::<Payment>(payment_id).await?;
                    let receipt = current_receipt(uow, payment_id).await?;
                    payment.status = PaymentService::complete(&payment, receipt.as_ref())?;

                    let tanda_id = payment.tanda_id;
                    let user_id = payment.user_id.clone();

                    let mut unpaid = uow
                        .query::<Turn, _>(Visibility::Active, |t| {
                            t.tanda_id == tanda_id && t.user_id == user_id && !t.is_paid_out
                        })
                        .await?;
                    unpaid.sort_by_key(|t| t.turn_number);

                    let paid_turn = match unpaid.into_iter().next() {
                        Some(mut turn) => {
                            turn.is_paid_out = true;
                            let turn_id = turn.id;
                            uow.update(turn).await?;

                            let participants = uow
                                .query::<TandaParticipant, _>(Visibility::Active, |p| {
                                    p.tanda_id == tanda_id && p.user_id == user_id
                                })
                                .await?;
                            for mut participant in participants {
                                participant.has_received_payout = true;
                                uow.update(participant).await?;
                            }
                            Some(turn_id)
                        }
                        None => None,
                    };

                    uow.update(payment).await?;
                    uow.append_audit(
                        actions::COMPLETE_PAYMENT,
                        Payment::KIND.as_str(),
                        payment_id,
                        AuditSeverity::Info,
                    );
                    Ok(paid_turn)
                })
            })
            .await?;

        info!(
            payment_id = %payment_id,
            turn_id = ?paid_turn,
            actor = %creator,
            "payment completed"
        );
        Ok(paid_turn)
    }

    /// Lists Pending payments with their tanda name and receipt locator.
    pub async fn list_pending_payments(&self) -> Result<Vec<PendingPaymentItem>, WorkflowError> {
        self.repo
            .read(move |uow| {
                Box::pin(async move {
                    let payments = uow
                        .query::<Payment, _>(Visibility::Active, |p| {
                            p.status == PaymentStatus::Pending
                        })
                        .await?;

                    let mut items = Vec::with_capacity(payments.len());
                    for payment in payments {
                        let tanda_name = uow
                            .find::<Tanda>(payment.tanda_id, Visibility::Active)
                            .await?
                            .map(|t| t.name)
                            .unwrap_or_default();
                        let receipt_uri = current_receipt(uow, payment.id)
                            .await?
                            .and_then(|r| r.locator().map(str::to_string));

                        items.push(PendingPaymentItem {
                            id: payment.id,
                            tanda_name,
                            user_id: payment.user_id,
                            amount: payment.amount,
                            receipt_uri,
                        });
                    }
                    Ok(items)
                })
            })
            .await
    }

    /// Returns a visible payment with its current receipt.
    pub async fn get_payment(&self, payment_id: PaymentId) -> Result<PaymentDetail, WorkflowError> {
        self.repo
            .read(move |uow| {
                Box::pin(async move {
                    let payment = uow.get::<Payment>(payment_id).await?;
                    let receipt = current_receipt(uow, payment_id).await?;
                    Ok(PaymentDetail { payment, receipt })
                })
            })
            .await
    }
}

impl std::fmt::Debug for PaymentWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentWorkflow")
            .field("repo", &self.repo)
            .field("blob_store", &self.blob_store.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

/// The visible receipt of a payment, newest first if several survive.
async fn current_receipt(
    uow: &mut UnitOfWork,
    payment_id: PaymentId,
) -> Result<Option<PaymentReceipt>, WorkflowError> {
    let receipts = uow
        .query::<PaymentReceipt, _>(Visibility::Active, |r| r.payment_id == payment_id)
        .await?;
    Ok(receipts.into_iter().max_by_key(|r| r.uploaded_at))
}
