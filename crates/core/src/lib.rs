//! Core business logic for Angeles Tandas.
//!
//! This crate holds the tanda and payment workflows, the audit ledger, and
//! the security primitives. It has ZERO web or database dependencies: the
//! record store is reached through the [`persistence::RecordStore`]
//! capability and receipts through [`storage::BlobStore`].
//!
//! # Modules
//!
//! - `security` - Password hashing and field encryption
//! - `audit` - Audit ledger and the commit-time change interceptor
//! - `persistence` - Units of work, record capabilities, soft-delete visibility
//! - `tanda` - Tanda lifecycle and turn draw
//! - `payment` - Payment lifecycle and receipt gating
//! - `profile` - Member profiles with encrypted fields
//! - `storage` - Receipt blob storage

pub mod audit;
pub mod error;
pub mod payment;
pub mod persistence;
pub mod profile;
pub mod security;
pub mod storage;
pub mod tanda;

pub use error::WorkflowError;
