//! Audit ledger and change interceptor.
//!
//! Two kinds of entries land in the ledger, both inside the same commit as
//! the mutation they describe:
//!
//! - interceptor entries (`Created`, `Modified`, `SoftDeleted`), one per
//!   changed record that carries audit metadata
//! - business entries named after the workflow operation
//!   (`CreateTanda`, `ApprovePayment`, ...), appended through
//!   [`UnitOfWork::append_audit`](crate::persistence::UnitOfWork::append_audit)
//!
//! The ledger is append-only. [`AuditLedger`] exposes reads and nothing else.

mod interceptor;
mod ledger;
mod types;

pub use interceptor::{ChangeInterceptor, ChangeKind, InterceptedBatch, PendingChange};
pub use ledger::AuditLedger;
pub use types::{AuditLog, AuditSeverity, actions};
