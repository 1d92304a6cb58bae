//! Commit-time change interceptor.
//!
//! Runs over every pending change of a unit of work right before the batch
//! is handed to the store:
//!
//! | Change | Metadata                | Ledger entry          | Store write |
//! |--------|-------------------------|-----------------------|-------------|
//! | Insert | created_at, created_by  | `Created` / Info      | Insert      |
//! | Update | modified_at, modified_by| `Modified` / Info     | Update      |
//! | Delete | modified_at, modified_by| `SoftDeleted` / Warning | Update with `is_deleted` |
//!
//! A delete of a record without the soft-delete capability is rejected.

use chrono::{DateTime, Utc};
use tandas_shared::Actor;

use super::types::{AuditLog, AuditSeverity, actions};
use crate::persistence::{EntityRecord, Mutation};
use crate::storage::StorageError;

/// What a unit of work wants to do with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// New record.
    Insert,
    /// Changed record read at `expected_version`.
    Update {
        /// Version observed when the record was read.
        expected_version: u64,
    },
    /// Delete request for a record read at `expected_version`.
    Delete {
        /// Version observed when the record was read.
        expected_version: u64,
    },
}

/// A staged change.
#[derive(Debug, Clone)]
pub struct PendingChange {
    /// Record state to write.
    pub record: EntityRecord,
    /// Requested change.
    pub kind: ChangeKind,
}

/// Output of [`ChangeInterceptor::intercept`].
#[derive(Debug, Default)]
pub struct InterceptedBatch {
    /// Store writes, in staging order.
    pub mutations: Vec<Mutation>,
    /// One entry per change to an auditable or soft-deleted record.
    pub audit_entries: Vec<AuditLog>,
}

/// Stamps metadata, converts deletes, and emits ledger entries.
#[derive(Debug)]
pub struct ChangeInterceptor<'a> {
    actor: &'a Actor,
    now: DateTime<Utc>,
}

impl<'a> ChangeInterceptor<'a> {
    /// Creates an interceptor for one commit.
    #[must_use]
    pub fn new(actor: &'a Actor, now: DateTime<Utc>) -> Self {
        Self { actor, now }
    }

    /// Transforms staged changes into store writes and ledger entries.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::HardDeleteRejected`] if a delete targets a
    /// record that cannot be soft-deleted. Nothing is returned in that case,
    /// so the whole commit is abandoned.
    pub fn intercept(
        &self,
        changes: impl IntoIterator<Item = PendingChange>,
    ) -> Result<InterceptedBatch, StorageError> {
        let mut batch = InterceptedBatch::default();

        for PendingChange { mut record, kind } in changes {
            let key = record.key();

            let entry = match kind {
                ChangeKind::Insert => {
                    let entry = record.as_auditable_mut().map(|auditable| {
                        auditable.audit_mut().stamp_created(self.actor, self.now);
                        (actions::CREATED, AuditSeverity::Info)
                    });
                    batch.mutations.push(Mutation::Insert(record));
                    entry
                }
                ChangeKind::Update { expected_version } => {
                    let entry = record.as_auditable_mut().map(|auditable| {
                        auditable.audit_mut().stamp_modified(self.actor, self.now);
                        (actions::MODIFIED, AuditSeverity::Info)
                    });
                    batch.mutations.push(Mutation::Update {
                        record,
                        expected_version,
                    });
                    entry
                }
                ChangeKind::Delete { expected_version } => {
                    let Some(soft) = record.as_soft_deletable_mut() else {
                        return Err(StorageError::HardDeleteRejected {
                            entity: key.kind.to_string(),
                            id: key.id.to_string(),
                        });
                    };
                    soft.mark_deleted();

                    if let Some(auditable) = record.as_auditable_mut() {
                        auditable.audit_mut().stamp_modified(self.actor, self.now);
                    }
                    batch.mutations.push(Mutation::Update {
                        record,
                        expected_version,
                    });
                    Some((actions::SOFT_DELETED, AuditSeverity::Warning))
                }
            };

            if let Some((action, severity)) = entry {
                batch.audit_entries.push(AuditLog::new(
                    self.actor,
                    action,
                    key.kind.as_str(),
                    key.id,
                    severity,
                    self.now,
                ));
            }
        }

        Ok(batch)
    }
}
