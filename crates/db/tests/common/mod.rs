//! Shared fixtures for workflow integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tandas_core::audit::AuditLog;
use tandas_core::payment::{CreatePaymentRequest, PaymentWorkflow};
use tandas_core::persistence::{
    CommitBatch, EntityKey, EntityKind, FixedClock, RecordStore, Repository, StoreTransaction,
    Versioned,
};
use tandas_core::storage::{StorageError, StorageService};
use tandas_core::tanda::{CreateTandaRequest, TandaWorkflow, Turn};
use tandas_db::InMemoryStore;
use tandas_shared::Actor;
use tandas_shared::config::WorkflowConfig;
use tandas_shared::types::{PaymentId, TandaId};

/// Store wrapper that fails the next commit on request.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_next_commit: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_next_commit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        Ok(Box::new(FlakyTransaction {
            inner: self.inner.begin().await?,
            fail: Arc::clone(&self.fail_next_commit),
        }))
    }

    async fn audit_log(&self) -> Result<Vec<AuditLog>, StorageError> {
        self.inner.audit_log().await
    }
}

struct FlakyTransaction {
    inner: Box<dyn StoreTransaction>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl StoreTransaction for FlakyTransaction {
    async fn load(&mut self, key: EntityKey) -> Result<Option<Versioned>, StorageError> {
        self.inner.load(key).await
    }

    async fn scan(&mut self, kind: EntityKind) -> Result<Vec<Versioned>, StorageError> {
        self.inner.scan(kind).await
    }

    async fn commit(self: Box<Self>, batch: CommitBatch) -> Result<(), StorageError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            self.inner.rollback().await?;
            return Err(StorageError::operation("injected commit failure"));
        }
        self.inner.commit(batch).await
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.inner.rollback().await
    }
}

/// Workflows wired over one in-memory store and a frozen clock.
pub struct Harness {
    pub store: InMemoryStore,
    pub flaky: FlakyStore,
    pub clock: Arc<FixedClock>,
    pub repo: Repository,
    pub tandas: TandaWorkflow,
    pub payments: PaymentWorkflow,
    pub blobs: Arc<StorageService>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn harness() -> Harness {
    harness_with(WorkflowConfig::default())
}

pub fn harness_with(policy: WorkflowConfig) -> Harness {
    let store = InMemoryStore::new();
    let flaky = FlakyStore::new(store.clone());
    let clock = Arc::new(FixedClock::new(start_time()));
    let repo = Repository::with_clock(Arc::new(flaky.clone()), clock.clone());
    let blobs = Arc::new(StorageService::in_memory().unwrap());

    Harness {
        tandas: TandaWorkflow::new(repo.clone()),
        payments: PaymentWorkflow::new(repo.clone(), policy).with_blob_store(blobs.clone()),
        store,
        flaky,
        clock,
        repo,
        blobs,
    }
}

pub fn admin() -> Actor {
    Actor::user("admin")
}

pub fn user(n: usize) -> String {
    format!("user-{n}")
}

pub fn tanda_request(name: &str, amount: Decimal, participants: i32) -> CreateTandaRequest {
    CreateTandaRequest {
        name: name.to_string(),
        amount_per_person: amount,
        number_of_participants: participants,
    }
}

impl Harness {
    pub async fn audit(&self) -> Vec<AuditLog> {
        self.repo.ledger().entries().await.unwrap()
    }

    pub async fn audit_count(&self) -> usize {
        self.repo.ledger().count().await.unwrap()
    }

    pub async fn actions_for(&self, entity_type: &str, id: impl std::fmt::Display) -> Vec<String> {
        self.repo
            .ledger()
            .entries_for(entity_type, id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    /// Draft tanda with a full roster of `user-1` .. `user-n`.
    pub async fn full_tanda(&self, n: usize) -> TandaId {
        let participants = i32::try_from(n).unwrap();
        let tanda = self
            .tandas
            .create_tanda(tanda_request("Ahorro", Decimal::ONE_HUNDRED, participants), admin())
            .await
            .unwrap();
        for i in 1..=n {
            self.tandas
                .add_participant(tanda.id, user(i), admin())
                .await
                .unwrap();
        }
        tanda.id
    }

    pub async fn active_tanda(&self, n: usize) -> (TandaId, Vec<Turn>) {
        let tanda_id = self.full_tanda(n).await;
        let turns = self.tandas.activate_tanda(tanda_id, admin()).await.unwrap();
        (tanda_id, turns)
    }

    pub async fn payment(&self, tanda_id: TandaId, user_id: &str) -> PaymentId {
        self.payments
            .create_payment(
                CreatePaymentRequest {
                    tanda_id,
                    user_id: user_id.to_string(),
                    amount: Decimal::ONE_HUNDRED,
                },
                Actor::user(user_id),
            )
            .await
            .unwrap()
    }

    /// Pending payment with a verified receipt.
    pub async fn verified_payment(&self, tanda_id: TandaId, user_id: &str) -> PaymentId {
        let payment_id = self.payment(tanda_id, user_id).await;
        self.payments
            .upload_receipt(
                payment_id,
                Actor::user(user_id),
                format!("memory://receipts/{payment_id}/receipt.pdf"),
            )
            .await
            .unwrap();
        self.payments
            .verify_receipt(payment_id, admin())
            .await
            .unwrap();
        payment_id
    }
}
