//! Acting identity for a single operation.
//!
//! An `Actor` is passed explicitly into every workflow call and flows down to
//! the commit step, so two concurrent operations can never observe each
//! other's identity.

use serde::{Deserialize, Serialize};

/// Identity performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum Actor {
    /// Work done by the system itself (jobs, seeding, cascades).
    #[default]
    System,
    /// Work done on behalf of an authenticated user.
    User(String),
}

impl Actor {
    /// Creates a user actor.
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self::User(user_id.into())
    }

    /// Returns the user id, or `None` for the system actor.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::System => None,
            Self::User(id) => Some(id),
        }
    }

    /// Rebuilds an actor from a stored, nullable user id.
    #[must_use]
    pub fn from_stored(user_id: Option<&str>) -> Self {
        user_id.map_or(Self::System, Self::user)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User(id) => write!(f, "{id}"),
        }
    }
}
