//! Stored records and the capabilities they opt into.
//!
//! Auditing and soft deletion are expressed as two independent traits,
//! [`Auditable`] and [`SoftDeletable`]. The change interceptor and the read
//! filter dispatch on whether a record has the capability, never on its
//! concrete type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tandas_shared::Actor;
use tandas_shared::types::{PaymentId, ParticipantId, ProfileId, ReceiptId, TandaId, TurnId};
use uuid::Uuid;

use crate::payment::{Payment, PaymentReceipt};
use crate::profile::Profile;
use crate::tanda::{Tanda, TandaParticipant, Turn};

/// Create/modify metadata.
///
/// Only the change interceptor writes these fields; callers can read them
/// but have no way to set them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    created_at: Option<DateTime<Utc>>,
    created_by: Option<String>,
    modified_at: Option<DateTime<Utc>>,
    modified_by: Option<String>,
}

impl AuditStamp {
    /// When the record was first committed.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Who created the record. `None` for the system.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    /// When the record was last modified.
    #[must_use]
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified_at
    }

    /// Who last modified the record. `None` for the system.
    #[must_use]
    pub fn modified_by(&self) -> Option<&str> {
        self.modified_by.as_deref()
    }

    pub(crate) fn stamp_created(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.created_at = Some(now);
        self.created_by = actor.user_id().map(str::to_string);
    }

    pub(crate) fn stamp_modified(&mut self, actor: &Actor, now: DateTime<Utc>) {
        self.modified_at = Some(now);
        self.modified_by = actor.user_id().map(str::to_string);
    }
}

/// Records carrying create/modify metadata.
pub trait Auditable {
    /// Read access to the metadata.
    fn audit(&self) -> &AuditStamp;

    /// Write access for the change interceptor.
    fn audit_mut(&mut self) -> &mut AuditStamp;
}

/// Records that are hidden instead of physically removed.
pub trait SoftDeletable {
    /// Whether the record has been soft-deleted.
    fn is_deleted(&self) -> bool;

    /// Marks the record deleted.
    fn mark_deleted(&mut self);
}

/// Stored entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// [`Tanda`]
    Tanda,
    /// [`TandaParticipant`]
    Participant,
    /// [`Turn`]
    Turn,
    /// [`Payment`]
    Payment,
    /// [`PaymentReceipt`]
    Receipt,
    /// [`Profile`]
    Profile,
}

impl EntityKind {
    /// Entity type name as written to the audit ledger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tanda => "Tanda",
            Self::Participant => "TandaParticipant",
            Self::Turn => "Turn",
            Self::Payment => "Payment",
            Self::Receipt => "PaymentReceipt",
            Self::Profile => "Profile",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary key of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    /// Entity type.
    pub kind: EntityKind,
    /// Record id.
    pub id: Uuid,
}

impl EntityKey {
    /// Builds the key of a typed id.
    #[must_use]
    pub fn of<R: Record>(id: R::Id) -> Self {
        Self {
            kind: R::KIND,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Any stored record.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    /// Tanda row.
    Tanda(Tanda),
    /// Participant row.
    Participant(TandaParticipant),
    /// Turn row.
    Turn(Turn),
    /// Payment row.
    Payment(Payment),
    /// Receipt row.
    Receipt(PaymentReceipt),
    /// Profile row.
    Profile(Profile),
}

/// Expands `$body` once per variant with `$r` bound to the inner record.
macro_rules! each_record {
    ($value:expr, $r:ident => $body:expr) => {
        match $value {
            EntityRecord::Tanda($r) => $body,
            EntityRecord::Participant($r) => $body,
            EntityRecord::Turn($r) => $body,
            EntityRecord::Payment($r) => $body,
            EntityRecord::Receipt($r) => $body,
            EntityRecord::Profile($r) => $body,
        }
    };
}

impl EntityRecord {
    /// Entity type of this record.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Tanda(_) => EntityKind::Tanda,
            Self::Participant(_) => EntityKind::Participant,
            Self::Turn(_) => EntityKind::Turn,
            Self::Payment(_) => EntityKind::Payment,
            Self::Receipt(_) => EntityKind::Receipt,
            Self::Profile(_) => EntityKind::Profile,
        }
    }

    /// Primary key of this record.
    #[must_use]
    pub fn key(&self) -> EntityKey {
        EntityKey {
            kind: self.kind(),
            id: each_record!(self, r => r.id.into()),
        }
    }

    /// The audit capability, if the record has it.
    #[must_use]
    pub fn as_auditable(&self) -> Option<&dyn Auditable> {
        each_record!(self, r => Some(r as &dyn Auditable))
    }

    /// Mutable audit capability, if the record has it.
    pub fn as_auditable_mut(&mut self) -> Option<&mut dyn Auditable> {
        each_record!(self, r => Some(r as &mut dyn Auditable))
    }

    /// The soft-delete capability, if the record has it.
    #[must_use]
    pub fn as_soft_deletable(&self) -> Option<&dyn SoftDeletable> {
        each_record!(self, r => Some(r as &dyn SoftDeletable))
    }

    /// Mutable soft-delete capability, if the record has it.
    pub fn as_soft_deletable_mut(&mut self) -> Option<&mut dyn SoftDeletable> {
        each_record!(self, r => Some(r as &mut dyn SoftDeletable))
    }

    /// Whether the record is soft-deleted. Records without the capability
    /// are never deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.as_soft_deletable().is_some_and(SoftDeletable::is_deleted)
    }
}

/// A typed entity that can be stored.
pub trait Record: Clone + Send + Sync + 'static {
    /// Entity type.
    const KIND: EntityKind;

    /// Typed primary key.
    type Id: Copy + Into<Uuid> + fmt::Display + Send + Sync + 'static;

    /// Primary key of this record.
    fn id(&self) -> Self::Id;

    /// Wraps the record.
    fn into_record(self) -> EntityRecord;

    /// Unwraps a record of this type.
    fn from_record(record: EntityRecord) -> Option<Self>;
}

macro_rules! stored_entity {
    ($ty:ty, $variant:ident, $id:ty) => {
        impl Auditable for $ty {
            fn audit(&self) -> &AuditStamp {
                &self.audit
            }

            fn audit_mut(&mut self) -> &mut AuditStamp {
                &mut self.audit
            }
        }

        impl SoftDeletable for $ty {
            fn is_deleted(&self) -> bool {
                self.is_deleted
            }

            fn mark_deleted(&mut self) {
                self.is_deleted = true;
            }
        }

        impl Record for $ty {
            const KIND: EntityKind = EntityKind::$variant;
            type Id = $id;

            fn id(&self) -> $id {
                self.id
            }

            fn into_record(self) -> EntityRecord {
                EntityRecord::$variant(self)
            }

            fn from_record(record: EntityRecord) -> Option<Self> {
                match record {
                    EntityRecord::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

stored_entity!(Tanda, Tanda, TandaId);
stored_entity!(TandaParticipant, Participant, ParticipantId);
stored_entity!(Turn, Turn, TurnId);
stored_entity!(Payment, Payment, PaymentId);
stored_entity!(PaymentReceipt, Receipt, ReceiptId);
stored_entity!(Profile, Profile, ProfileId);

/// Read visibility for soft-deletable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Normal reads: soft-deleted records are invisible.
    #[default]
    Active,
    /// Administrative reads that surface soft-deleted records too.
    IncludeDeleted,
}

impl Visibility {
    /// Whether a record passes this filter.
    #[must_use]
    pub fn admits(self, record: &EntityRecord) -> bool {
        match self {
            Self::Active => !record.is_deleted(),
            Self::IncludeDeleted => true,
        }
    }
}
