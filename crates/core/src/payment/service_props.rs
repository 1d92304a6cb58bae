//! Property-based tests for PaymentService.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tandas_shared::types::TandaId;

use crate::error::WorkflowError;
use crate::payment::service::PaymentService;
use crate::payment::types::{Payment, PaymentReceipt, PaymentStatus};

fn arb_status() -> impl Strategy<Value = PaymentStatus> {
    prop_oneof![
        Just(PaymentStatus::Pending),
        Just(PaymentStatus::Approved),
        Just(PaymentStatus::Completed),
        Just(PaymentStatus::Rejected),
    ]
}

/// None, unverified, or verified receipt.
fn arb_receipt_state() -> impl Strategy<Value = Option<bool>> {
    prop_oneof![Just(None), Just(Some(false)), Just(Some(true))]
}

fn payment_with(status: PaymentStatus) -> Payment {
    let mut payment = Payment::pending(TandaId::new(), "prop-user", Decimal::ONE_HUNDRED);
    payment.status = status;
    payment
}

fn receipt_for(payment: &Payment, verified: bool) -> PaymentReceipt {
    let mut receipt =
        PaymentReceipt::uploaded(payment.id, "memory://receipts/p.pdf".into(), Utc::now());
    receipt.is_verified = verified;
    receipt
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Missing or unverified receipt is a precondition failure in every status.
    #[test]
    fn prop_receipt_gate_precedes_status(status in arb_status(), verified in prop::option::of(Just(false))) {
        let payment = payment_with(status);
        let receipt = verified.map(|v| receipt_for(&payment, v));

        prop_assert!(matches!(
            PaymentService::approve(&payment, receipt.as_ref()),
            Err(WorkflowError::Precondition(_))
        ));
        prop_assert!(matches!(
            PaymentService::complete(&payment, receipt.as_ref()),
            Err(WorkflowError::Precondition(_))
        ));
    }

    /// Every status the rules hand back is a valid transition from the current one.
    #[test]
    fn prop_results_are_valid_transitions(
        status in arb_status(),
        receipt_state in arb_receipt_state(),
        allow in any::<bool>(),
    ) {
        let payment = payment_with(status);
        let receipt = receipt_state.map(|v| receipt_for(&payment, v));

        let results = [
            PaymentService::approve(&payment, receipt.as_ref()),
            PaymentService::complete(&payment, receipt.as_ref()),
            PaymentService::reject(&payment),
        ];
        for next in results.into_iter().flatten() {
            prop_assert!(PaymentService::is_valid_transition(status, next));
        }

        if let Ok(next) = PaymentService::upload_receipt(&payment, allow) {
            prop_assert!(next == status || PaymentService::is_valid_transition(status, next));
        }
    }

    /// Approve then complete with a verified receipt always ends Completed.
    #[test]
    fn prop_approve_then_complete(amount in 1i64..1_000_000) {
        let mut payment = Payment::pending(TandaId::new(), "u", Decimal::new(amount, 2));
        let receipt = receipt_for(&payment, true);

        payment.status = PaymentService::approve(&payment, Some(&receipt)).unwrap();
        payment.status = PaymentService::complete(&payment, Some(&receipt)).unwrap();
        prop_assert_eq!(payment.status, PaymentStatus::Completed);
    }

    /// Nothing leaves Completed.
    #[test]
    fn prop_completed_is_terminal(to in arb_status()) {
        prop_assert!(!PaymentService::is_valid_transition(PaymentStatus::Completed, to));
    }
}
