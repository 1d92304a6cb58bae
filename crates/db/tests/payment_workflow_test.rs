//! Integration tests for the payment lifecycle.

mod common;

use bytes::Bytes;
use chrono::Duration;
use rust_decimal_macros::dec;
use tandas_core::WorkflowError;
use tandas_core::audit::{AuditSeverity, actions};
use tandas_core::payment::{CreatePaymentRequest, PaymentStatus};
use tandas_core::persistence::{Auditable, EntityKind};
use tandas_shared::Actor;
use tandas_shared::config::WorkflowConfig;
use tandas_shared::types::{PaymentId, TandaId};

use common::{admin, harness, harness_with, start_time, user};

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_payment_starts_pending() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;

    let payment_id = h.payment(tanda_id, "user-1").await;

    let detail = h.payments.get_payment(payment_id).await.unwrap();
    assert_eq!(detail.payment.status, PaymentStatus::Pending);
    assert_eq!(detail.payment.created_at(), Some(start_time()));
    assert_eq!(detail.payment.audit().created_by(), Some("user-1"));
    assert!(detail.receipt.is_none());

    assert_eq!(
        h.actions_for("Payment", payment_id).await,
        vec![actions::CREATED, actions::CREATE_PAYMENT]
    );
}

#[tokio::test]
async fn test_create_payment_is_not_idempotent() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;

    let first = h.payment(tanda_id, "user-1").await;
    let second = h.payment(tanda_id, "user-1").await;

    assert_ne!(first, second);
    assert_eq!(h.payments.list_pending_payments().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_payment_validation() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let before = h.audit_count().await;

    let request = |tanda_id, user_id: &str, amount| CreatePaymentRequest {
        tanda_id,
        user_id: user_id.to_string(),
        amount,
    };

    let zero = h
        .payments
        .create_payment(request(tanda_id, "user-1", dec!(0)), Actor::user("user-1"))
        .await;
    assert!(matches!(zero, Err(WorkflowError::Validation(_))));

    let anonymous = h
        .payments
        .create_payment(request(tanda_id, "", dec!(10)), Actor::System)
        .await;
    assert!(matches!(anonymous, Err(WorkflowError::Validation(_))));

    let orphan = h
        .payments
        .create_payment(request(TandaId::new(), "user-1", dec!(10)), Actor::user("user-1"))
        .await;
    assert!(matches!(orphan, Err(WorkflowError::NotFound { entity: "Tanda", .. })));

    assert_eq!(h.audit_count().await, before);
}

// ============================================================================
// Receipts
// ============================================================================

#[tokio::test]
async fn test_upload_receipt_missing_payment() {
    let h = harness();
    let err = h
        .payments
        .upload_receipt(PaymentId::new(), Actor::user("user-1"), "memory://x".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { entity: "Payment", .. }));
}

#[tokio::test]
async fn test_reupload_replaces_receipt_and_resets_verification() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.verified_payment(tanda_id, "user-1").await;
    let first = h.payments.get_payment(payment_id).await.unwrap().receipt.unwrap();
    assert!(first.is_verified);

    h.clock.advance(Duration::minutes(5));
    let second_id = h
        .payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://receipts/b.png".to_string())
        .await
        .unwrap();

    let detail = h.payments.get_payment(payment_id).await.unwrap();
    let current = detail.receipt.unwrap();
    assert_eq!(current.id, second_id);
    assert!(!current.is_verified);
    assert_eq!(current.uploaded_at, start_time() + Duration::minutes(5));
    assert_eq!(detail.payment.status, PaymentStatus::Pending);

    let replaced = h.actions_for("PaymentReceipt", first.id).await;
    assert!(replaced.contains(&actions::SOFT_DELETED.to_string()));
    assert_eq!(h.store.rows(EntityKind::Receipt).await.len(), 2);

    // Approval needs the new receipt verified
    let err = h.payments.approve_payment(payment_id, admin()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));
}

#[tokio::test]
async fn test_upload_receipt_file_goes_through_blob_store() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-2").await;
    let body = Bytes::from_static(b"%PDF-1.7 transfer receipt");

    h.payments
        .upload_receipt_file(payment_id, Actor::user("user-2"), body.clone(), "recibo marzo.pdf")
        .await
        .unwrap();

    let receipt = h.payments.get_payment(payment_id).await.unwrap().receipt.unwrap();
    let locator = receipt.locator().unwrap().to_string();
    assert!(locator.starts_with("memory://receipts/"));
    assert!(locator.ends_with("/recibo_marzo.pdf"));
    assert_eq!(h.blobs.read(&locator).await.unwrap(), body);

    let pending = h.payments.list_pending_payments().await.unwrap();
    assert_eq!(pending[0].receipt_uri.as_deref(), Some(locator.as_str()));
}

#[tokio::test]
async fn test_upload_receipt_file_for_missing_payment_writes_nothing() {
    let h = harness();
    let err = h
        .payments
        .upload_receipt_file(PaymentId::new(), admin(), Bytes::from_static(b"x"), "r.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
    assert_eq!(h.audit_count().await, 0);
}

#[tokio::test]
async fn test_verify_receipt_rules() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;

    let err = h.payments.verify_receipt(payment_id, admin()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));

    h.payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://r".to_string())
        .await
        .unwrap();
    let receipt_id = h.payments.verify_receipt(payment_id, admin()).await.unwrap();

    let err = h.payments.verify_receipt(payment_id, admin()).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::InvalidState {
            entity: "PaymentReceipt",
            ..
        }
    ));

    let recorded = h.actions_for("PaymentReceipt", receipt_id).await;
    assert_eq!(
        recorded,
        vec![
            actions::CREATED,
            actions::UPLOAD_RECEIPT,
            actions::MODIFIED,
            actions::VERIFY_RECEIPT
        ]
    );
}

// ============================================================================
// Approve / reject / complete
// ============================================================================

#[tokio::test]
async fn test_approve_without_verified_receipt_is_precondition() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;

    let err = h.payments.approve_payment(payment_id, admin()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));

    h.payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://r".to_string())
        .await
        .unwrap();
    let err = h.payments.approve_payment(payment_id, admin()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));
    assert_eq!(err.status_code(), 422);

    let detail = h.payments.get_payment(payment_id).await.unwrap();
    assert_eq!(detail.payment.status, PaymentStatus::Pending);
    assert!(detail.payment.approved_at.is_none());
}

#[tokio::test]
async fn test_approve_sets_timestamp_and_actor() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.verified_payment(tanda_id, "user-1").await;
    h.clock.advance(Duration::hours(2));

    h.payments.approve_payment(payment_id, admin()).await.unwrap();

    let payment = h.payments.get_payment(payment_id).await.unwrap().payment;
    assert_eq!(payment.status, PaymentStatus::Approved);
    assert_eq!(payment.approved_at, Some(start_time() + Duration::hours(2)));
    assert_eq!(payment.audit().modified_by(), Some("admin"));

    let approved = h
        .repo
        .ledger()
        .entries_by_action(actions::APPROVE_PAYMENT)
        .await
        .unwrap();
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].entity_id, payment_id.to_string());

    let again = h.payments.approve_payment(payment_id, admin()).await;
    assert!(matches!(again, Err(WorkflowError::InvalidState { .. })));
}

#[tokio::test]
async fn test_reject_carries_reason() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;

    h.payments
        .reject_payment(payment_id, admin(), "amount does not match".to_string())
        .await
        .unwrap();

    let rejected = h
        .repo
        .ledger()
        .entries_by_action(actions::REJECT_PAYMENT)
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].severity, AuditSeverity::Warning);
    assert_eq!(rejected[0].details.as_deref(), Some("amount does not match"));

    assert!(h.payments.list_pending_payments().await.unwrap().is_empty());

    let again = h
        .payments
        .reject_payment(payment_id, admin(), "again".to_string())
        .await;
    assert!(matches!(again, Err(WorkflowError::InvalidState { .. })));
}

#[tokio::test]
async fn test_reupload_after_rejection_follows_policy() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;
    h.payments
        .reject_payment(payment_id, admin(), "blurry".to_string())
        .await
        .unwrap();

    h.payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://clear".to_string())
        .await
        .unwrap();
    let payment = h.payments.get_payment(payment_id).await.unwrap().payment;
    assert_eq!(payment.status, PaymentStatus::Pending);

    let strict = harness_with(WorkflowConfig {
        allow_reupload_after_rejection: false,
    });
    let (tanda_id, _) = strict.active_tanda(2).await;
    let payment_id = strict.payment(tanda_id, "user-1").await;
    strict
        .payments
        .reject_payment(payment_id, admin(), "blurry".to_string())
        .await
        .unwrap();

    let err = strict
        .payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://clear".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));
}

#[tokio::test]
async fn test_reupload_after_approval_reopens_payment() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.verified_payment(tanda_id, "user-1").await;
    h.payments.approve_payment(payment_id, admin()).await.unwrap();
    assert!(h.payments.get_payment(payment_id).await.unwrap().payment.approved_at.is_some());

    h.payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://corrected".to_string())
        .await
        .unwrap();

    let detail = h.payments.get_payment(payment_id).await.unwrap();
    assert_eq!(detail.payment.status, PaymentStatus::Pending);
    assert!(detail.payment.approved_at.is_none());
    assert!(!detail.receipt.unwrap().is_verified);

    let err = h.payments.complete_payment(payment_id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));
}

#[tokio::test]
async fn test_reupload_after_completion_is_refused() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.verified_payment(tanda_id, "user-1").await;
    h.payments.approve_payment(payment_id, admin()).await.unwrap();
    h.payments.complete_payment(payment_id).await.unwrap();
    let before = h.audit_count().await;

    let err = h
        .payments
        .upload_receipt(payment_id, Actor::user("user-1"), "memory://late".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));
    assert_eq!(h.audit_count().await, before);
}

#[tokio::test]
async fn test_reject_accepts_blank_reason() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;

    h.payments
        .reject_payment(payment_id, admin(), String::new())
        .await
        .unwrap();

    let payment = h.payments.get_payment(payment_id).await.unwrap().payment;
    assert_eq!(payment.status, PaymentStatus::Rejected);
}

#[tokio::test]
async fn test_edited_snapshot_is_not_persisted() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.payment(tanda_id, "user-1").await;

    let mut snapshot = h.payments.get_payment(payment_id).await.unwrap().payment;
    snapshot.status = PaymentStatus::Completed;

    // Status only moves through the workflow, which still demands a receipt
    let stored = h.payments.get_payment(payment_id).await.unwrap().payment;
    assert_eq!(stored.status, PaymentStatus::Pending);
    let err = h.payments.approve_payment(payment_id, admin()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Precondition(_)));
}

#[tokio::test]
async fn test_complete_pays_out_turn_atomically() {
    let h = harness();
    let (tanda_id, turns) = h.active_tanda(3).await;
    let payment_id = h.verified_payment(tanda_id, "user-2").await;
    h.payments.approve_payment(payment_id, admin()).await.unwrap();

    let paid = h.payments.complete_payment(payment_id).await.unwrap();

    let expected = turns.iter().find(|t| t.user_id == "user-2").unwrap();
    assert_eq!(paid, Some(expected.id));

    let detail = h.tandas.get_tanda(tanda_id).await.unwrap();
    let paid_turns: Vec<_> = detail.turns.iter().filter(|t| t.is_paid_out).collect();
    assert_eq!(paid_turns.len(), 1);
    assert_eq!(paid_turns[0].user_id, "user-2");
    let payee = detail
        .participants
        .iter()
        .find(|p| p.user_id == "user-2")
        .unwrap();
    assert!(payee.has_received_payout);

    let payment = h.payments.get_payment(payment_id).await.unwrap().payment;
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert_eq!(payment.audit().modified_by(), Some("user-2"));

    let completed = h
        .repo
        .ledger()
        .entries_by_action(actions::COMPLETE_PAYMENT)
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].actor_user_id.as_deref(), Some("user-2"));
}

#[tokio::test]
async fn test_complete_requires_approved() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let payment_id = h.verified_payment(tanda_id, "user-1").await;

    let err = h.payments.complete_payment(payment_id).await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidState { .. }));

    let err = h.payments.complete_payment(PaymentId::new()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }));
}

#[tokio::test]
async fn test_complete_without_unpaid_turn_marks_nothing() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;

    let outsider = h.verified_payment(tanda_id, &user(9)).await;
    h.payments.approve_payment(outsider, admin()).await.unwrap();
    assert_eq!(h.payments.complete_payment(outsider).await.unwrap(), None);

    let first = h.verified_payment(tanda_id, "user-1").await;
    h.payments.approve_payment(first, admin()).await.unwrap();
    assert!(h.payments.complete_payment(first).await.unwrap().is_some());

    let second = h.verified_payment(tanda_id, "user-1").await;
    h.payments.approve_payment(second, admin()).await.unwrap();
    assert_eq!(h.payments.complete_payment(second).await.unwrap(), None);

    let detail = h.tandas.get_tanda(tanda_id).await.unwrap();
    assert_eq!(detail.turns.iter().filter(|t| t.is_paid_out).count(), 1);
}

#[tokio::test]
async fn test_completing_every_turn_allows_tanda_completion() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;

    for i in 1..=2 {
        let payment_id = h.verified_payment(tanda_id, &user(i)).await;
        h.payments.approve_payment(payment_id, admin()).await.unwrap();
        h.payments.complete_payment(payment_id).await.unwrap();
    }

    h.tandas.complete_tanda(tanda_id, admin()).await.unwrap();
    let detail = h.tandas.get_tanda(tanda_id).await.unwrap();
    assert_eq!(detail.tanda.status, tandas_core::tanda::TandaStatus::Completed);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_list_pending_joins_tanda_name() {
    let h = harness();
    let (tanda_id, _) = h.active_tanda(2).await;
    let pending = h.payment(tanda_id, "user-1").await;
    let approved = h.verified_payment(tanda_id, "user-2").await;
    h.payments.approve_payment(approved, admin()).await.unwrap();

    let listed = h.payments.list_pending_payments().await.unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, pending);
    assert_eq!(listed[0].tanda_name, "Ahorro");
    assert_eq!(listed[0].amount, dec!(100));
    assert!(listed[0].receipt_uri.is_none());
}
