//! Corral Engine - ownership allocation for the customer pool
//!
//! The engine composes the storage, ACL, directory, and audit collaborators
//! behind a single entry point, the [`CustomerAllocator`]:
//!
//! - **CustomerAllocator**: create, claim, receive, transfer, release,
//!   lock toggle, delete, follow-up recording
//! - **QuotaEvaluator**: per-user owned and locked ceilings
//! - **CascadeSync**: release-side propagation to contacts
//! - **PoolSweeper**: periodic reclamation of inactive owned customers
//! - **ImportReconciler**: bulk create-or-update with per-item results
//!
//! ## Concurrency
//!
//! Ownership mutations are serialized per customer by conditional writes at
//! the storage layer; the loser of a race observes a zero-row update and
//! gets a stale-state error. Quota checks are advisory pre-checks without a
//! global holder lock: two concurrent assignments can both pass and
//! together overshoot a ceiling. That race is accepted; quotas are eventual
//! bounds, not hard real-time constraints.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod allocator;
pub mod cascade;
pub mod context;
pub mod error;
pub mod import;
pub mod quota;
pub mod sweeper;

// Re-exports
pub use allocator::CustomerAllocator;
pub use cascade::CascadeSync;
pub use context::{Actor, RequestContext};
pub use error::{AllocError, Result};
pub use import::{ImportItem, ImportOutcome, ImportReconciler};
pub use quota::QuotaEvaluator;
pub use sweeper::{PoolSweeper, SweepReport};
