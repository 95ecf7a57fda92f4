//! Corral Types - Core types for the customer pool allocation engine
//!
//! Corral manages exclusive ownership of a shared pool of customers among
//! users, subject to per-user capacity quotas, a lock flag that suspends
//! ownership changes, and a periodic reclamation sweep that returns inactive
//! customers to the pool.
//!
//! ## Key Concepts
//!
//! - **Customer**: the owned resource; `owner_user_id = None` means "in the
//!   pool" and eligible for claim
//! - **Quota rules**: per-user ceilings on owned and locked customer counts
//! - **PoolPolicy**: global expiry timers driving the reclamation sweep
//! - **AclEntry**: per-resource access grants kept in sync with ownership

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod acl;
pub mod customer;
pub mod ids;
pub mod pool;
pub mod quota;

// Re-export main types
pub use acl::{AccessLevel, AclEntry, ResourceKind};
pub use customer::{Contact, Customer, CustomerDraft, CustomerPatch};
pub use ids::{ContactId, CustomerId, UserId};
pub use pool::PoolPolicy;
pub use quota::{LockQuotaRule, OwnerQuotaRule};
