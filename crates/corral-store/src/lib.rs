//! Corral Store - Collaborator contracts and in-memory implementations
//!
//! This crate defines the storage seams the allocation engine depends on:
//!
//! - **CustomerStore**: customer records, conditional ownership writes
//! - **AclStore**: per-resource access grants
//! - **ContactStore**: sub-resources whose owner mirrors the parent
//! - **ReferenceCounter**: dependent records that block deletion
//! - **UserDirectory**: holder identity validation and display names
//! - **QuotaRuleStore / PoolPolicyStore**: allocation configuration
//!
//! ## In-Memory vs Persistent
//!
//! The crate provides in-memory implementations suitable for development
//! and testing. Production deployments should use persistent backends
//! (PostgreSQL, etc.) that implement the same traits.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod error;
pub mod memory;
pub mod traits;

// Re-exports
pub use error::{StoreError, StoreResult};
pub use memory::{
    MemoryAclStore, MemoryContactStore, MemoryCustomerStore, MemoryPoolPolicy, MemoryQuotaRules,
    MemoryReferenceCounter, MemoryUserDirectory,
};
pub use traits::{
    AclStore, ContactStore, CustomerStore, PoolPolicyStore, QuotaRuleStore, ReferenceCounter,
    UserDirectory,
};
