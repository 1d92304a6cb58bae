//! Bootstrap seeder for Angeles Tandas development and testing.
//!
//! Loads configuration, refuses to start without a valid encryption key,
//! then seeds an admin profile and runs one demo tanda round end to end
//! against the in-memory store.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use rust_decimal::Decimal;
use tandas_core::audit::AuditSeverity;
use tandas_core::payment::{CreatePaymentRequest, PaymentWorkflow};
use tandas_core::persistence::{Record, Repository};
use tandas_core::profile::{CreateProfileRequest, Profile, ProfileWorkflow, SensitiveFields};
use tandas_core::security::SecurityService;
use tandas_core::storage::StorageService;
use tandas_core::tanda::{CreateTandaRequest, TandaWorkflow};
use tandas_db::InMemoryStore;
use tandas_shared::config::LoggingConfig;
use tandas_shared::{Actor, AppConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Audit action recorded when the admin account is bootstrapped.
const ADMIN_USER_CREATED: &str = "AdminUserCreated";

const DEMO_PARTICIPANTS: i32 = 3;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let security = SecurityService::from_config(&config.encryption)
        .context("encryption.key must be base64 for exactly 32 bytes")?;
    let blobs = StorageService::from_config(config.storage.clone())
        .context("failed to initialise receipt storage")?;
    info!(provider = blobs.provider_name(), "receipt storage ready");

    let store = InMemoryStore::new();
    let repo = Repository::new(Arc::new(store.clone()));

    let admin_user = std::env::var("SEED_ADMIN_USER").unwrap_or_else(|_| "admin".to_string());
    seed_admin(&repo, security, &admin_user).await?;

    let payments =
        PaymentWorkflow::new(repo.clone(), config.workflow).with_blob_store(Arc::new(blobs));
    seed_demo_round(&repo, &payments, &Actor::user(admin_user)).await?;

    let entries = repo.ledger().count().await?;
    info!(rows = store.row_count().await, audit_entries = entries, "seeding complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Seeds the admin profile and records its creation.
async fn seed_admin(
    repo: &Repository,
    security: SecurityService,
    admin_user: &str,
) -> anyhow::Result<()> {
    let profiles = ProfileWorkflow::new(repo.clone(), security);
    let profile_id = profiles
        .create_profile(
            CreateProfileRequest {
                user_id: admin_user.to_string(),
                full_name: "Administrator".to_string(),
                sensitive: SensitiveFields::default(),
            },
            Actor::System,
        )
        .await?;

    repo.transaction(Actor::System, move |uow| {
        Box::pin(async move {
            uow.append_audit(
                ADMIN_USER_CREATED,
                Profile::KIND.as_str(),
                profile_id,
                AuditSeverity::Warning,
            );
            Ok(())
        })
    })
    .await?;

    info!(profile_id = %profile_id, user = admin_user, "admin profile seeded");
    Ok(())
}

/// Creates a demo tanda and takes its first payment through to completion.
async fn seed_demo_round(
    repo: &Repository,
    payments: &PaymentWorkflow,
    admin: &Actor,
) -> anyhow::Result<()> {
    let tandas = TandaWorkflow::new(repo.clone());
    let tanda = tandas
        .create_tanda(
            CreateTandaRequest {
                name: "Tanda Demo".to_string(),
                amount_per_person: Decimal::new(50_000, 2),
                number_of_participants: DEMO_PARTICIPANTS,
            },
            admin.clone(),
        )
        .await?;

    for i in 1..=DEMO_PARTICIPANTS {
        tandas
            .add_participant(tanda.id, format!("demo-{i}"), admin.clone())
            .await?;
    }
    let turns = tandas.activate_tanda(tanda.id, admin.clone()).await?;
    let first = turns
        .first()
        .context("activated tanda has no turns")?
        .user_id
        .clone();

    let payer = Actor::user(first.clone());
    let payment_id = payments
        .create_payment(
            CreatePaymentRequest {
                tanda_id: tanda.id,
                user_id: first,
                amount: tanda.amount_per_person,
            },
            payer.clone(),
        )
        .await?;
    payments
        .upload_receipt_file(
            payment_id,
            payer,
            Bytes::from_static(b"demo transfer receipt"),
            "demo-receipt.txt",
        )
        .await?;
    payments.verify_receipt(payment_id, admin.clone()).await?;
    payments.approve_payment(payment_id, admin.clone()).await?;
    let paid_turn = payments.complete_payment(payment_id).await?;

    info!(
        tanda_id = %tanda.id,
        payment_id = %payment_id,
        turn_id = ?paid_turn,
        "demo round seeded"
    );
    Ok(())
}
