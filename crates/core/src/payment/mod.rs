//! Payment lifecycle.
//!
//! # Modules
//!
//! - `types` - Payment and receipt records plus projections
//! - `service` - Pure state transition rules and receipt gating
//! - `workflow` - Transactional operations

pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use service::PaymentService;
pub use types::{
    CreatePaymentRequest, Payment, PaymentDetail, PaymentReceipt, PaymentStatus,
    PendingPaymentItem,
};
pub use workflow::PaymentWorkflow;
