//! Store error types

use corral_types::{ContactId, CustomerId};
use thiserror::Error;

/// Errors surfaced by storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Customer already exists: {0}")]
    DuplicateCustomer(CustomerId),

    #[error("Contact already exists: {0}")]
    DuplicateContact(ContactId),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
