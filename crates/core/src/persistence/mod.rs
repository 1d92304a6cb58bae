//! Transactional persistence seam.
//!
//! The concrete storage engine lives outside this crate. Workflows talk to
//! it through [`Repository`], which hands out one [`UnitOfWork`] per
//! operation:
//!
//! ```text
//! Repository::transaction(actor, |uow| ...)
//!     │
//!     ├── uow.find / uow.query      soft-delete filter applied here, once
//!     ├── uow.insert / update / delete   crate-private
//!     ├── uow.append_audit          business audit entry
//!     │
//!     └── uow.commit()
//!           ├── ChangeInterceptor   stamps metadata, delete -> soft delete
//!           └── StoreTransaction::commit(CommitBatch)   all or nothing
//! ```

mod clock;
mod record;
mod repository;
mod store;
mod unit_of_work;

pub use clock::{Clock, FixedClock, SystemClock};
pub use record::{
    AuditStamp, Auditable, EntityKey, EntityKind, EntityRecord, Record, SoftDeletable, Visibility,
};
pub use repository::Repository;
pub use store::{CommitBatch, Mutation, RecordStore, StoreTransaction, Versioned};
pub use unit_of_work::UnitOfWork;
