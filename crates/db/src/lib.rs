//! Record store implementations.
//!
//! This crate provides:
//! - [`InMemoryStore`], a versioned, read-committed `RecordStore`
//! - Integration tests that drive every workflow through it

pub mod memory;

pub use memory::InMemoryStore;
