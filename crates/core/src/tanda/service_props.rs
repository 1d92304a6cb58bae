//! Property-based tests for TandaService.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::error::WorkflowError;
use crate::tanda::service::{TandaService, TandaTerms};
use crate::tanda::types::{CreateTandaRequest, Tanda, TandaStatus};

/// Strategy for generating random TandaStatus values.
fn arb_status() -> impl Strategy<Value = TandaStatus> {
    prop_oneof![
        Just(TandaStatus::Draft),
        Just(TandaStatus::Active),
        Just(TandaStatus::Completed),
        Just(TandaStatus::Cancelled),
    ]
}

/// Strategy for positive amounts with two decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn tanda_with(status: TandaStatus, participants: u32) -> Tanda {
    let terms = TandaTerms::for_roster(Decimal::ONE_HUNDRED, participants).unwrap();
    let mut tanda = Tanda::draft("prop", Decimal::ONE_HUNDRED, terms, Utc::now());
    tanda.status = status;
    tanda
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// For n > 0: turns == n and pot == amount × n.
    #[test]
    fn prop_create_derives_turns_and_pot(n in 1i32..=500, amount in arb_amount()) {
        let request = CreateTandaRequest {
            name: "Ahorro".to_string(),
            amount_per_person: amount,
            number_of_participants: n,
        };

        let terms = TandaService::validate_create(&request).unwrap();
        let n = u32::try_from(n).unwrap();
        prop_assert_eq!(terms.number_of_turns, n);
        prop_assert_eq!(terms.number_of_participants, n);
        prop_assert_eq!(terms.total_collected_per_turn, amount * Decimal::from(n));
    }

    /// n <= 0 always fails validation.
    #[test]
    fn prop_create_rejects_non_positive(n in i32::MIN..=0, amount in arb_amount()) {
        let request = CreateTandaRequest {
            name: "Ahorro".to_string(),
            amount_per_person: amount,
            number_of_participants: n,
        };

        prop_assert!(matches!(
            TandaService::validate_create(&request),
            Err(WorkflowError::Validation(_))
        ));
    }

    /// Activation succeeds iff Draft and the roster is exactly full.
    #[test]
    fn prop_activate_iff_draft_and_full(
        status in arb_status(),
        size in 1u32..50,
        count in 0usize..60,
    ) {
        let tanda = tanda_with(status, size);
        let result = TandaService::activate(&tanda, count);

        let full = usize::try_from(size).unwrap() == count;
        if status == TandaStatus::Draft && full {
            prop_assert_eq!(result.unwrap(), TandaStatus::Active);
        } else {
            prop_assert!(result.is_err());
        }
    }

    /// Every status a service rule produces is a valid transition.
    #[test]
    fn prop_rules_agree_with_transition_table(status in arb_status(), size in 1u32..10) {
        let tanda = tanda_with(status, size);

        if let Ok(next) = TandaService::activate(&tanda, usize::try_from(size).unwrap()) {
            prop_assert!(TandaService::is_valid_transition(status, next));
        }
        if let Ok(next) = TandaService::cancel(&tanda, "reason") {
            prop_assert!(TandaService::is_valid_transition(status, next));
        }
        if let Ok(next) = TandaService::complete(&tanda, 0) {
            prop_assert!(TandaService::is_valid_transition(status, next));
        }
    }

    /// Terminal statuses have no outgoing transitions.
    #[test]
    fn prop_terminal_is_final(from in arb_status(), to in arb_status()) {
        if from.is_terminal() {
            prop_assert!(!TandaService::is_valid_transition(from, to));
        }
    }
}
