//! Record store capability implemented by the storage engine.

use async_trait::async_trait;

use super::record::{EntityKey, EntityKind, EntityRecord};
use crate::audit::AuditLog;
use crate::storage::StorageError;

/// A record together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    /// The stored record.
    pub record: EntityRecord,
    /// Monotonic row version, starting at 1 on insert.
    pub version: u64,
}

/// One write in a commit batch.
///
/// There is no delete variant. Deletes reach storage as soft-delete updates.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert a new record. Fails with `DuplicateKey` if the key exists.
    Insert(EntityRecord),
    /// Replace a record. Fails with `Conflict` unless the stored version
    /// still equals `expected_version`.
    Update {
        /// New record state.
        record: EntityRecord,
        /// Version observed when the record was read.
        expected_version: u64,
    },
}

impl Mutation {
    /// The record being written.
    #[must_use]
    pub fn record(&self) -> &EntityRecord {
        match self {
            Self::Insert(record) | Self::Update { record, .. } => record,
        }
    }
}

/// Everything one unit of work writes, applied atomically.
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    /// Record writes.
    pub mutations: Vec<Mutation>,
    /// Audit entries appended in the same commit.
    pub audit_entries: Vec<AuditLog>,
}

impl CommitBatch {
    /// Whether the batch writes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty() && self.audit_entries.is_empty()
    }
}

/// Transactional record store.
///
/// Implementations must provide at least read-committed isolation and must
/// apply a [`CommitBatch`] entirely or not at all.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError>;

    /// Committed audit entries in append order.
    async fn audit_log(&self) -> Result<Vec<AuditLog>, StorageError>;
}

/// An open store transaction.
///
/// Dropping a transaction without committing discards it.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Loads one record, soft-deleted or not.
    async fn load(&mut self, key: EntityKey) -> Result<Option<Versioned>, StorageError>;

    /// Loads every record of a kind, soft-deleted or not.
    async fn scan(&mut self, kind: EntityKind) -> Result<Vec<Versioned>, StorageError>;

    /// Applies the batch atomically.
    async fn commit(self: Box<Self>, batch: CommitBatch) -> Result<(), StorageError>;

    /// Discards the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}
