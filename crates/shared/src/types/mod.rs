//! Common types used across the application.

pub mod actor;
pub mod id;

pub use actor::Actor;
pub use id::*;
