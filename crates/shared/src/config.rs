//! Application configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Field encryption configuration.
    pub encryption: EncryptionConfig,
    /// Blob storage configuration for receipts.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Workflow policy switches.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Encryption configuration.
#[derive(Clone, Deserialize)]
pub struct EncryptionConfig {
    /// Base64-encoded AES-256 key. Must decode to exactly 32 bytes.
    pub key: String,
}

impl std::fmt::Debug for EncryptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionConfig")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Storage provider configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// In-process memory (tests and seeding).
    #[default]
    Memory,
    /// Local filesystem (development only)
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
    /// S3-compatible storage: Cloudflare R2, Supabase, AWS S3, DigitalOcean Spaces
    S3 {
        /// S3 endpoint URL.
        endpoint: String,
        /// S3 bucket name.
        bucket: String,
        /// AWS access key ID.
        access_key_id: String,
        /// AWS secret access key.
        secret_access_key: String,
        /// AWS region.
        region: String,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Azure storage account name.
        account: String,
        /// Azure storage access key.
        access_key: String,
        /// Azure container name.
        container: String,
    },
}

impl StorageProvider {
    /// Create local filesystem provider (development only).
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Create Azure Blob Storage provider.
    #[must_use]
    pub fn azure_blob(
        account: impl Into<String>,
        access_key: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self::AzureBlob {
            account: account.into(),
            access_key: access_key.into(),
            container: container.into(),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::LocalFs { .. } => "local",
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azure_blob",
        }
    }
}

/// Blob storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Storage provider.
    #[serde(default)]
    pub provider: StorageProvider,
    /// Maximum receipt size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

/// Workflow policy switches.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WorkflowConfig {
    /// Whether a receipt may be re-uploaded for a rejected payment, which
    /// puts the payment back into `Pending`.
    #[serde(default = "default_true")]
    pub allow_reupload_after_rejection: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            allow_reupload_after_rejection: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "tandas=info".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, including when
    /// `encryption.key` is absent.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TANDAS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
