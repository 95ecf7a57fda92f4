//! Corral Audit - Change-event trail for ownership operations
//!
//! Every successful allocator mutation emits a [`ChangeEvent`] describing
//! what happened in human-readable terms, tagged with a stable kind, the
//! business id, the acting user, and free-form context variables.
//!
//! Emission is fire-and-forget from the engine's point of view: a failing
//! sink is logged and never fails the operation that produced the event.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod event;
pub mod sink;

// Re-exports
pub use error::{AuditError, Result};
pub use event::{ChangeEvent, ChangeKind};
pub use sink::{AuditTrail, FileAuditTrail, MemoryAuditTrail, TracingAuditTrail};
