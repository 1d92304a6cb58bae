//! Tanda state machine rules.
//!
//! Pure functions: they look at current state and either return the next
//! state or the error the workflow must surface. No I/O happens here.

use rust_decimal::Decimal;

use super::types::{CreateTandaRequest, Tanda, TandaStatus};
use crate::error::WorkflowError;

const ENTITY: &str = "Tanda";
const MAX_NAME_LEN: usize = 200;

/// Validated creation terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TandaTerms {
    /// Roster size.
    pub number_of_participants: u32,
    /// Always equal to the roster size.
    pub number_of_turns: u32,
    /// Pot size per turn.
    pub total_collected_per_turn: Decimal,
}

impl TandaTerms {
    /// Derives the terms for a roster of `number_of_participants`.
    ///
    /// Returns `None` if the pot per turn does not fit in a `Decimal`.
    #[must_use]
    pub fn for_roster(amount_per_person: Decimal, number_of_participants: u32) -> Option<Self> {
        let total_collected_per_turn =
            amount_per_person.checked_mul(Decimal::from(number_of_participants))?;
        Some(Self {
            number_of_participants,
            number_of_turns: number_of_participants,
            total_collected_per_turn,
        })
    }
}

/// Stateless service for tanda lifecycle rules.
pub struct TandaService;

impl TandaService {
    /// Validates a creation request and derives the tanda's terms.
    ///
    /// # Returns
    /// * `Err(WorkflowError::Validation)` if the participant count is not
    ///   positive, the amount is not positive, the name is blank or longer
    ///   than 200 characters, or the pot per turn overflows
    pub fn validate_create(request: &CreateTandaRequest) -> Result<TandaTerms, WorkflowError> {
        let number_of_participants = u32::try_from(request.number_of_participants)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                WorkflowError::validation("number of participants must be greater than zero")
            })?;

        if request.amount_per_person <= Decimal::ZERO {
            return Err(WorkflowError::validation(
                "amount per person must be greater than zero",
            ));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(WorkflowError::validation("name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(WorkflowError::validation(format!(
                "name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        TandaTerms::for_roster(request.amount_per_person, number_of_participants)
            .ok_or_else(|| WorkflowError::validation("total per turn overflows"))
    }

    /// Checks that a participant may join.
    ///
    /// # Returns
    /// * `Err(WorkflowError::InvalidState)` unless the tanda is in Draft
    /// * `Err(WorkflowError::Validation)` if the user is already enrolled or
    ///   the roster is full
    pub fn enroll(
        tanda: &Tanda,
        enrolled_user_ids: &[&str],
        user_id: &str,
    ) -> Result<u32, WorkflowError> {
        Self::ensure_draft(tanda)?;

        if enrolled_user_ids.contains(&user_id) {
            return Err(WorkflowError::validation(format!(
                "user {user_id} is already enrolled"
            )));
        }

        let count = u32::try_from(enrolled_user_ids.len()).unwrap_or(u32::MAX);
        if count >= tanda.number_of_participants {
            return Err(WorkflowError::validation(format!(
                "tanda already has {} of {} participants",
                count, tanda.number_of_participants
            )));
        }

        Ok(count + 1)
    }

    /// Checks that the roster may change.
    pub fn ensure_draft(tanda: &Tanda) -> Result<(), WorkflowError> {
        match tanda.status {
            TandaStatus::Draft => Ok(()),
            actual => Err(WorkflowError::invalid_state(
                ENTITY,
                tanda.id,
                TandaStatus::Draft,
                actual,
            )),
        }
    }

    /// Activate a draft tanda.
    ///
    /// # Returns
    /// * `Ok(TandaStatus::Active)` if the tanda is in Draft with a full roster
    /// * `Err(WorkflowError::InvalidState)` if not in Draft
    /// * `Err(WorkflowError::Validation)` if the participant count differs
    ///   from `number_of_participants`
    pub fn activate(tanda: &Tanda, participant_count: usize) -> Result<TandaStatus, WorkflowError> {
        Self::ensure_draft(tanda)?;

        if u32::try_from(participant_count).ok() != Some(tanda.number_of_participants) {
            return Err(WorkflowError::validation(format!(
                "cannot activate with {participant_count} of {} participants",
                tanda.number_of_participants
            )));
        }

        Ok(TandaStatus::Active)
    }

    /// Cancel a draft or active tanda.
    ///
    /// # Returns
    /// * `Err(WorkflowError::Validation)` if the reason is blank
    /// * `Err(WorkflowError::InvalidState)` if already terminal
    pub fn cancel(tanda: &Tanda, reason: &str) -> Result<TandaStatus, WorkflowError> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::validation("cancellation reason is required"));
        }

        match tanda.status {
            TandaStatus::Draft | TandaStatus::Active => Ok(TandaStatus::Cancelled),
            actual => Err(WorkflowError::invalid_state(
                ENTITY,
                tanda.id,
                "draft or active",
                actual,
            )),
        }
    }

    /// Complete an active tanda.
    ///
    /// # Returns
    /// * `Err(WorkflowError::InvalidState)` if not Active
    /// * `Err(WorkflowError::Precondition)` while any turn is unpaid
    pub fn complete(tanda: &Tanda, unpaid_turns: usize) -> Result<TandaStatus, WorkflowError> {
        if tanda.status != TandaStatus::Active {
            return Err(WorkflowError::invalid_state(
                ENTITY,
                tanda.id,
                TandaStatus::Active,
                tanda.status,
            ));
        }

        if unpaid_turns > 0 {
            return Err(WorkflowError::precondition(format!(
                "{unpaid_turns} turn(s) not yet paid out"
            )));
        }

        Ok(TandaStatus::Completed)
    }

    /// Checks that a tanda may be soft-deleted. Active tandas may not.
    pub fn ensure_deletable(tanda: &Tanda) -> Result<(), WorkflowError> {
        match tanda.status {
            TandaStatus::Active => Err(WorkflowError::invalid_state(
                ENTITY,
                tanda.id,
                "draft, completed or cancelled",
                TandaStatus::Active,
            )),
            _ => Ok(()),
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Draft → Active
    /// - Active → Completed
    /// - Draft → Cancelled
    /// - Active → Cancelled
    #[must_use]
    pub fn is_valid_transition(from: TandaStatus, to: TandaStatus) -> bool {
        matches!(
            (from, to),
            (TandaStatus::Draft, TandaStatus::Active | TandaStatus::Cancelled)
                | (
                    TandaStatus::Active,
                    TandaStatus::Completed | TandaStatus::Cancelled
                )
        )
    }
}
