//! Storage service implementation using Apache OpenDAL.

use async_trait::async_trait;
use bytes::Bytes;
use opendal::{Operator, services};
use tandas_shared::config::{StorageProvider, StorageSettings};
use uuid::Uuid;

use super::BlobStore;
use super::error::StorageError;

const KEY_PREFIX: &str = "receipts";

/// Storage service for payment receipts.
#[derive(Debug, Clone)]
pub struct StorageService {
    operator: Operator,
    settings: StorageSettings,
}

impl StorageService {
    /// Create a new storage service from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_config(settings: StorageSettings) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&settings.provider)?;
        Ok(Self { operator, settings })
    }

    /// In-memory service, used by tests and the seeder.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory backend cannot be initialized.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::from_config(StorageSettings::default())
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        match provider {
            StorageProvider::Memory => build(services::Memory::default()),
            StorageProvider::LocalFs { root } => build(
                services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| StorageError::configuration("invalid path"))?,
                ),
            ),
            StorageProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => build(
                services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region),
            ),
            StorageProvider::AzureBlob {
                account,
                access_key,
                container,
            } => build(
                services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container),
            ),
        }
    }

    /// Validate an upload against the configured size limit.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::FileTooLarge`] if `size` exceeds the limit.
    pub fn validate_upload(&self, size: u64) -> Result<(), StorageError> {
        if size > self.settings.max_file_size {
            return Err(StorageError::file_too_large(
                size,
                self.settings.max_file_size,
            ));
        }
        Ok(())
    }

    /// Generate storage key for a receipt.
    ///
    /// Format: `receipts/{object_id}/{sanitized_filename}`
    #[must_use]
    pub fn generate_storage_key(object_id: Uuid, filename: &str) -> String {
        format!("{KEY_PREFIX}/{object_id}/{}", sanitize_filename(filename))
    }

    /// Turns a storage key into the locator handed back to callers.
    #[must_use]
    pub fn locator(&self, key: &str) -> String {
        format!("{}://{key}", self.provider_name())
    }

    /// Read an object back by the locator returned from [`BlobStore::put`].
    ///
    /// # Errors
    ///
    /// Returns an error if the locator belongs to another provider or the
    /// object cannot be read.
    pub async fn read(&self, locator: &str) -> Result<Bytes, StorageError> {
        let key = self.key_from_locator(locator)?;
        let buffer = self.operator.read(key).await?;
        Ok(buffer.to_bytes())
    }

    /// Check if an object exists in storage.
    pub async fn exists(&self, locator: &str) -> bool {
        match self.key_from_locator(locator) {
            Ok(key) => self.operator.stat(key).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.settings.provider.name()
    }

    fn key_from_locator<'a>(&self, locator: &'a str) -> Result<&'a str, StorageError> {
        locator
            .strip_prefix(self.provider_name())
            .and_then(|rest| rest.strip_prefix("://"))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| StorageError::InvalidKey(locator.to_string()))
    }
}

#[async_trait]
impl BlobStore for StorageService {
    async fn put(&self, bytes: Bytes, name: &str) -> Result<String, StorageError> {
        self.validate_upload(bytes.len() as u64)?;

        let key = Self::generate_storage_key(Uuid::now_v7(), name);
        self.operator.write(&key, bytes).await?;

        tracing::debug!(key = %key, provider = self.provider_name(), "receipt object stored");
        Ok(self.locator(&key))
    }
}

fn build(builder: impl opendal::Builder) -> Result<Operator, StorageError> {
    Ok(Operator::new(builder)
        .map_err(|e| StorageError::configuration(e.to_string()))?
        .finish())
}

/// Sanitize filename for storage key.
///
/// Only allows ASCII alphanumeric characters, dots, hyphens, and underscores.
/// An empty name becomes `receipt`.
fn sanitize_filename(filename: &str) -> String {
    if filename.trim().is_empty() {
        return "receipt".to_string();
    }

    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
