//! Receipt blob storage using Apache OpenDAL.
//!
//! The workflows only see the [`BlobStore`] capability: bytes go in, an
//! opaque locator string comes out. [`StorageService`] implements it for:
//! - In-process memory (tests, seeding)
//! - Local filesystem (development only)
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3
//! - Azure Blob Storage
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ PaymentWorkflow::upload_receipt_file         │
//! │        │ put(bytes, name) -> uri             │
//! ├────────▼─────────────────────────────────────┤
//! │ StorageService  (size check, key, locator)   │
//! ├──────────────────────────────────────────────┤
//! │ Apache OpenDAL  op.write / op.read           │
//! └──────────────────────────────────────────────┘
//! ```

mod error;
mod service;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::StorageError;
pub use service::StorageService;

/// Opaque binary object store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under a key derived from `name` and returns a locator.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the object is rejected or the backend fails.
    async fn put(&self, bytes: Bytes, name: &str) -> Result<String, StorageError>;
}
