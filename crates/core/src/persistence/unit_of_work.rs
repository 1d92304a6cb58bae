//! Per-operation unit of work.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tandas_shared::Actor;
use tracing::{debug, warn};

use super::clock::Clock;
use super::record::{EntityKey, Record, Visibility};
use super::store::{CommitBatch, StoreTransaction};
use crate::audit::{AuditLog, AuditSeverity, ChangeInterceptor, ChangeKind, PendingChange};
use crate::error::WorkflowError;
use crate::storage::StorageError;

/// One logical operation against the store.
///
/// Carries its own [`Actor`], so concurrent operations never share identity.
/// Reads see this unit's own staged writes. Nothing reaches the store until
/// [`UnitOfWork::commit`]; dropping the unit discards every staged change
/// and audit entry.
///
/// Staging inserts, updates and deletes is reserved to the workflows in this
/// crate. Outside callers may read and append audit entries only:
///
/// ```compile_fail
/// use tandas_core::persistence::Repository;
/// use tandas_core::tanda::Tanda;
/// use tandas_shared::Actor;
///
/// async fn force_status(repo: &Repository, tanda: Tanda) {
///     let mut uow = repo.begin(Actor::System).await.unwrap();
///     uow.update(tanda).await.unwrap();
///     uow.commit().await.unwrap();
/// }
/// ```
pub struct UnitOfWork {
    tx: Option<Box<dyn StoreTransaction>>,
    actor: Actor,
    clock: Arc<dyn Clock>,
    read_versions: HashMap<EntityKey, u64>,
    changes: Vec<PendingChange>,
    staged: HashMap<EntityKey, usize>,
    audit_entries: Vec<AuditLog>,
}

impl UnitOfWork {
    pub(crate) fn new(tx: Box<dyn StoreTransaction>, actor: Actor, clock: Arc<dyn Clock>) -> Self {
        Self {
            tx: Some(tx),
            actor,
            clock,
            read_versions: HashMap::new(),
            changes: Vec::new(),
            staged: HashMap::new(),
            audit_entries: Vec::new(),
        }
    }

    /// The identity this unit acts as.
    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Current time from the injected clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn tx(&mut self) -> Result<&mut (dyn StoreTransaction + 'static), StorageError> {
        match self.tx.as_mut() {
            Some(tx) => Ok(tx.as_mut()),
            None => Err(StorageError::TransactionClosed),
        }
    }

    /// Finds a record by id.
    ///
    /// With [`Visibility::Active`] a soft-deleted record, or one with a
    /// staged delete, is reported as absent.
    pub async fn find<R: Record>(
        &mut self,
        id: R::Id,
        visibility: Visibility,
    ) -> Result<Option<R>, WorkflowError> {
        let key = EntityKey::of::<R>(id);

        let record = if let Some(&idx) = self.staged.get(&key) {
            let change = &self.changes[idx];
            if matches!(change.kind, ChangeKind::Delete { .. }) && visibility == Visibility::Active {
                return Ok(None);
            }
            Some(change.record.clone())
        } else {
            let loaded = self.tx()?.load(key).await?;
            loaded.map(|versioned| {
                self.read_versions.entry(key).or_insert(versioned.version);
                versioned.record
            })
        };

        Ok(record
            .filter(|record| visibility.admits(record))
            .and_then(R::from_record))
    }

    /// Finds a visible record or fails with `NotFound`.
    pub async fn get<R: Record>(&mut self, id: R::Id) -> Result<R, WorkflowError> {
        self.find::<R>(id, Visibility::Active)
            .await?
            .ok_or_else(|| WorkflowError::not_found(R::KIND.as_str(), id))
    }

    /// Returns every record of type `R` matching `predicate`.
    ///
    /// The soft-delete filter is applied before `predicate` sees anything.
    pub async fn query<R, P>(
        &mut self,
        visibility: Visibility,
        predicate: P,
    ) -> Result<Vec<R>, WorkflowError>
    where
        R: Record,
        P: Fn(&R) -> bool + Send,
    {
        let scanned = self.tx()?.scan(R::KIND).await?;

        let mut seen = HashSet::with_capacity(scanned.len());
        let mut candidates = Vec::with_capacity(scanned.len());

        for versioned in scanned {
            let key = versioned.record.key();
            self.read_versions.entry(key).or_insert(versioned.version);
            seen.insert(key);

            match self.staged.get(&key) {
                Some(&idx) => {
                    let change = &self.changes[idx];
                    if matches!(change.kind, ChangeKind::Delete { .. })
                        && visibility == Visibility::Active
                    {
                        continue;
                    }
                    candidates.push(change.record.clone());
                }
                None => candidates.push(versioned.record),
            }
        }

        // Inserts staged in this unit are not in the store yet
        candidates.extend(
            self.changes
                .iter()
                .filter(|change| change.kind == ChangeKind::Insert)
                .filter(|change| {
                    let key = change.record.key();
                    key.kind == R::KIND && !seen.contains(&key)
                })
                .map(|change| change.record.clone()),
        );

        Ok(candidates
            .into_iter()
            .filter(|record| visibility.admits(record))
            .filter_map(R::from_record)
            .filter(|record| predicate(record))
            .collect())
    }

    /// Stages a new record.
    pub(crate) fn insert<R: Record>(&mut self, record: R) -> Result<(), WorkflowError> {
        let record = record.into_record();
        let key = record.key();

        if self.staged.contains_key(&key) {
            return Err(StorageError::duplicate_key(key.kind.as_str(), key.id).into());
        }

        self.stage(PendingChange {
            record,
            kind: ChangeKind::Insert,
        });
        Ok(())
    }

    /// Stages a changed record.
    ///
    /// The record must exist. The version it was first read at travels with
    /// the update so a concurrent change is detected at commit.
    pub(crate) async fn update<R: Record>(&mut self, record: R) -> Result<(), WorkflowError> {
        let id = record.id();
        let record = record.into_record();
        let key = record.key();

        if let Some(&idx) = self.staged.get(&key) {
            let change = &mut self.changes[idx];
            if matches!(change.kind, ChangeKind::Delete { .. }) {
                return Err(WorkflowError::not_found(R::KIND.as_str(), id));
            }
            change.record = record;
            return Ok(());
        }

        let expected_version = self.version_of::<R>(id).await?;
        self.stage(PendingChange {
            record,
            kind: ChangeKind::Update { expected_version },
        });
        Ok(())
    }

    /// Requests deletion of a visible record.
    ///
    /// The interceptor turns this into a soft delete at commit. A record
    /// inserted by this same unit is simply unstaged.
    pub(crate) async fn delete<R: Record>(&mut self, id: R::Id) -> Result<(), WorkflowError> {
        let key = EntityKey::of::<R>(id);

        if let Some(&idx) = self.staged.get(&key) {
            match self.changes[idx].kind {
                ChangeKind::Insert => {
                    self.changes.remove(idx);
                    self.reindex();
                }
                ChangeKind::Update { expected_version } => {
                    self.changes[idx].kind = ChangeKind::Delete { expected_version };
                }
                ChangeKind::Delete { .. } => {
                    return Err(WorkflowError::not_found(R::KIND.as_str(), id));
                }
            }
            return Ok(());
        }

        let record = self.get::<R>(id).await?;
        let expected_version = self.version_of::<R>(id).await?;
        self.stage(PendingChange {
            record: record.into_record(),
            kind: ChangeKind::Delete { expected_version },
        });
        Ok(())
    }

    /// Appends a business entry to the audit ledger.
    ///
    /// The entry is committed with this unit's changes or not at all.
    pub fn append_audit(
        &mut self,
        action: &str,
        entity_type: &str,
        entity_id: impl Display,
        severity: AuditSeverity,
    ) {
        let entry = AuditLog::new(
            &self.actor,
            action,
            entity_type,
            entity_id,
            severity,
            self.clock.now(),
        );
        self.audit_entries.push(entry);
    }

    /// Appends a business entry carrying extra context.
    pub fn append_audit_with_details(
        &mut self,
        action: &str,
        entity_type: &str,
        entity_id: impl Display,
        severity: AuditSeverity,
        details: impl Into<String>,
    ) {
        let entry = AuditLog::new(
            &self.actor,
            action,
            entity_type,
            entity_id,
            severity,
            self.clock.now(),
        )
        .with_details(details);
        self.audit_entries.push(entry);
    }

    /// Runs the change interceptor and commits everything atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the interceptor rejects a change or the store
    /// refuses the batch. Either way nothing is persisted.
    pub async fn commit(mut self) -> Result<(), WorkflowError> {
        let tx = self.tx.take().ok_or(StorageError::TransactionClosed)?;
        let now = self.clock.now();
        let changes = std::mem::take(&mut self.changes);
        self.staged.clear();

        let intercepted = match ChangeInterceptor::new(&self.actor, now).intercept(changes) {
            Ok(intercepted) => intercepted,
            Err(err) => {
                warn!(actor = %self.actor, error = %err, "change rejected, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                return Err(err.into());
            }
        };

        let mut audit_entries = intercepted.audit_entries;
        audit_entries.append(&mut self.audit_entries);

        let batch = CommitBatch {
            mutations: intercepted.mutations,
            audit_entries,
        };
        let mutation_count = batch.mutations.len();
        let audit_count = batch.audit_entries.len();

        if let Err(err) = tx.commit(batch).await {
            warn!(actor = %self.actor, error = %err, "commit failed");
            return Err(err.into());
        }

        debug!(
            actor = %self.actor,
            mutations = mutation_count,
            audit_entries = audit_count,
            "unit of work committed"
        );
        Ok(())
    }

    /// Discards every staged change and closes the transaction.
    pub async fn rollback(mut self) -> Result<(), WorkflowError> {
        self.changes.clear();
        self.staged.clear();
        self.audit_entries.clear();

        match self.tx.take() {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }

    async fn version_of<R: Record>(&mut self, id: R::Id) -> Result<u64, WorkflowError> {
        let key = EntityKey::of::<R>(id);
        if let Some(&version) = self.read_versions.get(&key) {
            return Ok(version);
        }

        let versioned = self
            .tx()?
            .load(key)
            .await?
            .ok_or_else(|| WorkflowError::not_found(R::KIND.as_str(), id))?;
        self.read_versions.insert(key, versioned.version);
        Ok(versioned.version)
    }

    fn stage(&mut self, change: PendingChange) {
        self.staged.insert(change.record.key(), self.changes.len());
        self.changes.push(change);
    }

    fn reindex(&mut self) {
        self.staged = self
            .changes
            .iter()
            .enumerate()
            .map(|(idx, change)| (change.record.key(), idx))
            .collect();
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.tx.is_some() && !(self.changes.is_empty() && self.audit_entries.is_empty()) {
            debug!(
                actor = %self.actor,
                discarded_changes = self.changes.len(),
                discarded_audit_entries = self.audit_entries.len(),
                "unit of work dropped without commit"
            );
        }
    }
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("actor", &self.actor)
            .field("open", &self.tx.is_some())
            .field("pending_changes", &self.changes.len())
            .field("pending_audit_entries", &self.audit_entries.len())
            .finish_non_exhaustive()
    }
}
