//! Versioned in-memory record store.
//!
//! Transactions read committed state and buffer nothing themselves: the
//! unit of work above them stages all writes. A commit takes the write lock,
//! validates every mutation against the current versions, and only then
//! applies the batch, so a batch is applied entirely or not at all.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tandas_core::audit::AuditLog;
use tandas_core::persistence::{
    CommitBatch, EntityKey, EntityKind, EntityRecord, Mutation, RecordStore, StoreTransaction,
    Versioned,
};
use tandas_core::storage::StorageError;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct Row {
    record: EntityRecord,
    version: u64,
    seq: u64,
}

impl Row {
    fn versioned(&self) -> Versioned {
        Versioned {
            record: self.record.clone(),
            version: self.version,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    rows: HashMap<EntityKey, Row>,
    next_seq: u64,
    audit_log: Vec<AuditLog>,
}

impl State {
    fn check(&self, batch: &CommitBatch) -> Result<(), StorageError> {
        let mut touched = HashSet::with_capacity(batch.mutations.len());

        for mutation in &batch.mutations {
            let key = mutation.record().key();
            if !touched.insert(key) {
                return Err(StorageError::conflict(key.kind.as_str(), key.id));
            }

            match mutation {
                Mutation::Insert(_) => {
                    if self.rows.contains_key(&key) {
                        return Err(StorageError::duplicate_key(key.kind.as_str(), key.id));
                    }
                }
                Mutation::Update {
                    expected_version, ..
                } => match self.rows.get(&key) {
                    Some(row) if row.version == *expected_version => {}
                    _ => return Err(StorageError::conflict(key.kind.as_str(), key.id)),
                },
            }
        }
        Ok(())
    }

    fn apply(&mut self, batch: CommitBatch) {
        for mutation in batch.mutations {
            match mutation {
                Mutation::Insert(record) => {
                    self.next_seq += 1;
                    self.rows.insert(
                        record.key(),
                        Row {
                            record,
                            version: 1,
                            seq: self.next_seq,
                        },
                    );
                }
                Mutation::Update { record, .. } => {
                    if let Some(row) = self.rows.get_mut(&record.key()) {
                        row.version += 1;
                        row.record = record;
                    }
                }
            }
        }
        self.audit_log.extend(batch.audit_entries);
    }
}

/// In-memory [`RecordStore`] with optimistic row versioning.
///
/// Cheap to clone; clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    next_tx: Arc<AtomicU64>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed row of a kind, soft-deleted ones included, in
    /// insertion order.
    pub async fn rows(&self, kind: EntityKind) -> Vec<Versioned> {
        scan_rows(&*self.state.read().await, kind)
    }

    /// Number of committed rows across all kinds.
    pub async fn row_count(&self) -> usize {
        self.state.read().await.rows.len()
    }
}

fn scan_rows(state: &State, kind: EntityKind) -> Vec<Versioned> {
    let mut rows: Vec<&Row> = state
        .rows
        .iter()
        .filter(|(key, _)| key.kind == kind)
        .map(|(_, row)| row)
        .collect();
    rows.sort_by_key(|row| row.seq);
    rows.into_iter().map(Row::versioned).collect()
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(tx = id, "transaction opened");
        Ok(Box::new(MemoryTransaction {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    async fn audit_log(&self) -> Result<Vec<AuditLog>, StorageError> {
        Ok(self.state.read().await.audit_log.clone())
    }
}

struct MemoryTransaction {
    id: u64,
    state: Arc<RwLock<State>>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn load(&mut self, key: EntityKey) -> Result<Option<Versioned>, StorageError> {
        Ok(self.state.read().await.rows.get(&key).map(Row::versioned))
    }

    async fn scan(&mut self, kind: EntityKind) -> Result<Vec<Versioned>, StorageError> {
        Ok(scan_rows(&*self.state.read().await, kind))
    }

    async fn commit(self: Box<Self>, batch: CommitBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            debug!(tx = self.id, "empty transaction committed");
            return Ok(());
        }

        let mut state = self.state.write().await;
        if let Err(err) = state.check(&batch) {
            warn!(tx = self.id, error = %err, "commit rejected");
            return Err(err);
        }

        let mutations = batch.mutations.len();
        let audit_entries = batch.audit_entries.len();
        state.apply(batch);

        debug!(tx = self.id, mutations, audit_entries, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        debug!(tx = self.id, "transaction rolled back");
        Ok(())
    }
}
