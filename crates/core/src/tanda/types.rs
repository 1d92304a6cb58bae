//! Tanda domain types.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tandas_shared::types::{ParticipantId, TandaId, TurnId};

use super::service::TandaTerms;
use crate::persistence::AuditStamp;

/// Tanda lifecycle status.
///
/// The valid transitions are:
/// - Draft → Active (activate)
/// - Active → Completed (complete)
/// - Draft → Cancelled, Active → Cancelled (cancel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TandaStatus {
    /// Enrolling participants.
    Draft,
    /// Turns drawn, payments flowing.
    Active,
    /// Every turn paid out (terminal).
    Completed,
    /// Abandoned (terminal).
    Cancelled,
}

impl TandaStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns true if no transition leaves this status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TandaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Participant standing within a tanda.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    /// Contributing normally.
    Active,
    /// Left the group.
    Left,
    /// Stopped paying.
    Defaulted,
}

impl ParticipantStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Left => "left",
            Self::Defaulted => "defaulted",
        }
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rotating savings group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tanda {
    /// Tanda id.
    pub id: TandaId,
    /// Display name.
    pub name: String,
    /// Contribution each participant makes per turn.
    pub amount_per_person: Decimal,
    /// Roster size.
    pub number_of_participants: u32,
    /// Always equal to `number_of_participants`; fixed at creation.
    pub number_of_turns: u32,
    /// `amount_per_person × number_of_participants`.
    pub total_collected_per_turn: Decimal,
    /// When the tanda was created.
    pub start_date: DateTime<Utc>,
    /// Lifecycle status.
    pub status: TandaStatus,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl Tanda {
    /// New tanda in `Draft` with validated terms.
    pub(crate) fn draft(
        name: impl Into<String>,
        amount_per_person: Decimal,
        terms: TandaTerms,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TandaId::new(),
            name: name.into(),
            amount_per_person,
            number_of_participants: terms.number_of_participants,
            number_of_turns: terms.number_of_turns,
            total_collected_per_turn: terms.total_collected_per_turn,
            start_date,
            status: TandaStatus::Draft,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }
}

/// Enrollment of a user in a tanda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TandaParticipant {
    /// Participant id.
    pub id: ParticipantId,
    /// Back-reference to the tanda.
    pub tanda_id: TandaId,
    /// Enrolled user.
    pub user_id: String,
    /// Provisional while in Draft, drawn at activation.
    pub turn_number: u32,
    /// Set once the participant's turn is paid out.
    pub has_received_payout: bool,
    /// Standing in the group.
    pub status: ParticipantStatus,
    /// Enrollment time.
    pub joined_at: DateTime<Utc>,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl TandaParticipant {
    pub(crate) fn enroll(
        tanda_id: TandaId,
        user_id: impl Into<String>,
        turn_number: u32,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ParticipantId::new(),
            tanda_id,
            user_id: user_id.into(),
            turn_number,
            has_received_payout: false,
            status: ParticipantStatus::Active,
            joined_at,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }
}

/// Payout slot drawn at activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Turn id.
    pub id: TurnId,
    /// Back-reference to the tanda.
    pub tanda_id: TandaId,
    /// 1-based payout position.
    pub turn_number: u32,
    /// Recipient.
    pub user_id: String,
    /// Hex proof that the order came from a committed seed. Never changes.
    pub randomness_token: String,
    /// Whether the payout happened.
    pub is_paid_out: bool,
    pub(crate) audit: AuditStamp,
    pub(crate) is_deleted: bool,
}

impl Turn {
    pub(crate) fn drawn(
        tanda_id: TandaId,
        turn_number: u32,
        user_id: impl Into<String>,
        randomness_token: String,
    ) -> Self {
        Self {
            id: TurnId::new(),
            tanda_id,
            turn_number,
            user_id: user_id.into(),
            randomness_token,
            is_paid_out: false,
            audit: AuditStamp::default(),
            is_deleted: false,
        }
    }
}

/// Request to create a tanda.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTandaRequest {
    /// Display name, 1 to 200 characters.
    pub name: String,
    /// Contribution per participant per turn.
    pub amount_per_person: Decimal,
    /// Roster size. Must be greater than zero.
    pub number_of_participants: i32,
}

/// Projection returned by `create_tanda`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TandaSummary {
    /// Tanda id.
    pub id: TandaId,
    /// Display name.
    pub name: String,
    /// Contribution per participant per turn.
    pub amount_per_person: Decimal,
    /// Roster size.
    pub number_of_participants: u32,
    /// Number of payout turns.
    pub number_of_turns: u32,
    /// Pot size per turn.
    pub total_collected_per_turn: Decimal,
    /// Lifecycle status.
    pub status: TandaStatus,
}

impl From<&Tanda> for TandaSummary {
    fn from(tanda: &Tanda) -> Self {
        Self {
            id: tanda.id,
            name: tanda.name.clone(),
            amount_per_person: tanda.amount_per_person,
            number_of_participants: tanda.number_of_participants,
            number_of_turns: tanda.number_of_turns,
            total_collected_per_turn: tanda.total_collected_per_turn,
            status: tanda.status,
        }
    }
}

/// Row of `list_tandas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TandaListItem {
    /// Tanda id.
    pub id: TandaId,
    /// Display name.
    pub name: String,
    /// Visible participants currently enrolled.
    pub current_participant_count: usize,
    /// Lifecycle status.
    pub status: TandaStatus,
    /// Set only in administrative listings that include deleted rows.
    pub is_deleted: bool,
}

/// Tanda with its roster and turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TandaDetail {
    /// The tanda.
    pub tanda: Tanda,
    /// Visible participants ordered by turn number.
    pub participants: Vec<TandaParticipant>,
    /// Turns ordered by turn number.
    pub turns: Vec<Turn>,
}
