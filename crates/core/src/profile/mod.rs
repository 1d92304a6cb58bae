//! Member profiles with encrypted identity fields.

pub mod types;
pub mod workflow;

pub use types::{CreateProfileRequest, Profile, ProfileView, SensitiveFields};
pub use workflow::ProfileWorkflow;
