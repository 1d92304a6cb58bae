//! Tanda lifecycle.
//!
//! # Modules
//!
//! - `types` - Tanda, participant and turn records plus projections
//! - `service` - Pure state transition rules
//! - `draw` - Seeded turn-order draw and randomness tokens
//! - `workflow` - Transactional operations

pub mod draw;
pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use draw::TurnDraw;
pub use service::{TandaService, TandaTerms};
pub use types::{
    CreateTandaRequest, ParticipantStatus, Tanda, TandaDetail, TandaListItem, TandaParticipant,
    TandaStatus, TandaSummary, Turn,
};
pub use workflow::TandaWorkflow;
