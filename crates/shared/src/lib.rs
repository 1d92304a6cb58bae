//! Shared identifiers, actor identity, and configuration for Angeles Tandas.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - The `Actor` that performs each operation
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::Actor;
