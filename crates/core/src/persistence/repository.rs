//! Entry point for transactional work.

use std::sync::Arc;

use futures::future::BoxFuture;
use tandas_shared::Actor;
use tracing::warn;

use super::clock::{Clock, SystemClock};
use super::store::RecordStore;
use super::unit_of_work::UnitOfWork;
use crate::audit::AuditLedger;
use crate::error::WorkflowError;

/// Transactional access to stored records.
///
/// Cheap to clone. Holds no per-operation state: the actor travels with
/// each [`UnitOfWork`].
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl Repository {
    /// Creates a repository using the wall clock.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates a repository with an injected clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn RecordStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Opens a unit of work acting as `actor`.
    pub async fn begin(&self, actor: Actor) -> Result<UnitOfWork, WorkflowError> {
        let tx = self.store.begin().await?;
        Ok(UnitOfWork::new(tx, actor, Arc::clone(&self.clock)))
    }

    /// Runs `operation` in a unit of work.
    ///
    /// Commits when the operation returns `Ok` and rolls back on `Err`. The
    /// caller sees either the full effect or none of it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let name = repo
    ///     .transaction(Actor::user("admin"), move |uow| {
    ///         Box::pin(async move {
    ///             let tanda = uow.get::<Tanda>(tanda_id).await?;
    ///             Ok(tanda.name)
    ///         })
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, F>(&self, actor: Actor, operation: F) -> Result<T, WorkflowError>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut UnitOfWork) -> BoxFuture<'u, Result<T, WorkflowError>> + Send,
    {
        let mut uow = self.begin(actor).await?;

        match operation(&mut uow).await {
            Ok(value) => {
                uow.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Runs a read-only `operation` as the system actor and rolls back.
    pub async fn read<T, F>(&self, operation: F) -> Result<T, WorkflowError>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut UnitOfWork) -> BoxFuture<'u, Result<T, WorkflowError>> + Send,
    {
        let mut uow = self.begin(Actor::System).await?;
        let result = operation(&mut uow).await;
        if let Err(rollback_err) = uow.rollback().await {
            warn!(error = %rollback_err, "rollback failed");
        }
        result
    }

    /// Read access to the audit ledger.
    #[must_use]
    pub fn ledger(&self) -> AuditLedger {
        AuditLedger::new(Arc::clone(&self.store))
    }

    /// The injected clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
