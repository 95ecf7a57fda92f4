//! Error types for the allocation engine

use corral_store::StoreError;
use corral_types::{CustomerId, ResourceKind, UserId};
use thiserror::Error;

/// Caller-visible failures of allocator operations
///
/// Every variant is terminal for the call that produced it; the engine
/// never retries internally. Batch paths collect these per item instead of
/// failing the whole batch.
#[derive(Debug, Error)]
pub enum AllocError {
    /// Customer id did not resolve
    #[error("Customer not found: {0}")]
    NotFound(CustomerId),

    /// Holder id unknown to the user directory
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// Claim required the pool state but the customer is owned
    #[error("Customer '{name}' already has an owner")]
    OwnerExists { name: String },

    /// Operation required an owner but the customer is in the pool
    #[error("Customer '{name}' is already in the pool")]
    InPool { name: String },

    /// State change blocked by the lock flag
    #[error("Customer '{name}' is locked, cannot {action}")]
    Locked { name: String, action: &'static str },

    /// Lock requested but the customer is already locked
    #[error("Customer '{name}' is already locked")]
    AlreadyLocked { name: String },

    /// Unlock requested but the customer is already unlocked
    #[error("Customer '{name}' is already unlocked")]
    AlreadyUnlocked { name: String },

    /// Owning one more customer would break an owner quota rule
    #[error("Owner quota exceeded for {user}")]
    OwnerQuotaExceeded { user: UserId },

    /// The user already holds as many locked customers as allowed
    #[error("Lock quota exceeded for {user}")]
    LockQuotaExceeded { user: UserId },

    /// Claim attempted on a customer with a terminal deal outcome
    #[error("Customer '{name}' has already dealt and cannot be claimed")]
    AlreadyDeal { name: String },

    /// Delete blocked by dependent records of the named kind
    #[error("Customer has linked {kind} records")]
    ReferenceExists { kind: ResourceKind },

    /// Actor lacks the capability the operation requires
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Required input missing or malformed
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A conditional ownership write affected zero rows; the state read
    /// during validation is stale
    #[error("Ownership of {0} changed concurrently")]
    OwnerUpdateConflict(CustomerId),

    /// Storage collaborator failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AllocError {
    /// Stable kind tag for callers that match on failure classes
    pub fn kind(&self) -> &'static str {
        match self {
            AllocError::NotFound(_) | AllocError::UserNotFound(_) => "not_found",
            AllocError::OwnerExists { .. } => "owner_exists",
            AllocError::InPool { .. } => "in_pool",
            AllocError::Locked { .. } => "locked",
            AllocError::AlreadyLocked { .. } | AllocError::AlreadyUnlocked { .. } => {
                "lock_toggle_noop"
            }
            AllocError::OwnerQuotaExceeded { .. } | AllocError::LockQuotaExceeded { .. } => {
                "quota_exceeded"
            }
            AllocError::AlreadyDeal { .. } => "already_deal",
            AllocError::ReferenceExists { .. } => "reference_exists",
            AllocError::PermissionDenied(_) => "permission_denied",
            AllocError::ValidationFailed(_) => "validation_failed",
            AllocError::OwnerUpdateConflict(_) => "owner_update_conflict",
            AllocError::Store(_) => "store",
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, AllocError>;
