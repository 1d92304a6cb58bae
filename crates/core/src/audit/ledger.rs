//! Read side of the audit ledger.

use std::fmt::Display;
use std::sync::Arc;

use super::types::AuditLog;
use crate::error::WorkflowError;
use crate::persistence::RecordStore;

/// Read-only view over committed audit entries.
///
/// Entries are appended by units of work at commit time. This type offers
/// no update or delete.
#[derive(Clone)]
pub struct AuditLedger {
    store: Arc<dyn RecordStore>,
}

impl AuditLedger {
    /// Creates a ledger view over a store.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// All entries in append order.
    pub async fn entries(&self) -> Result<Vec<AuditLog>, WorkflowError> {
        Ok(self.store.audit_log().await?)
    }

    /// Entries about one entity.
    pub async fn entries_for(
        &self,
        entity_type: &str,
        entity_id: impl Display,
    ) -> Result<Vec<AuditLog>, WorkflowError> {
        let entity_id = entity_id.to_string();
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .collect())
    }

    /// Entries with a given action name.
    pub async fn entries_by_action(&self, action: &str) -> Result<Vec<AuditLog>, WorkflowError> {
        Ok(self
            .entries()
            .await?
            .into_iter()
            .filter(|e| e.action == action)
            .collect())
    }

    /// Number of committed entries.
    pub async fn count(&self) -> Result<usize, WorkflowError> {
        Ok(self.store.audit_log().await?.len())
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger").finish_non_exhaustive()
    }
}
