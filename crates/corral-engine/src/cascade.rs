//! Ownership cascade to dependent sub-resources
//!
//! Releasing a customer to the pool clears the owner of its contacts,
//! mirroring the historical coupling where a contact's holder always equals
//! its parent customer's holder. Claim and transfer do NOT propagate;
//! contacts follow their parent out of ownership but never into it.

use crate::error::Result;
use corral_store::ContactStore;
use corral_types::CustomerId;
use std::sync::Arc;
use tracing::debug;

/// Propagates release-side ownership changes to contacts
pub struct CascadeSync {
    contacts: Arc<dyn ContactStore>,
}

impl CascadeSync {
    pub fn new(contacts: Arc<dyn ContactStore>) -> Self {
        Self { contacts }
    }

    /// Clear the owner of every contact attached to a released customer.
    /// Returns the number of contacts touched.
    pub async fn on_release_to_pool(&self, customer_id: &CustomerId) -> Result<u64> {
        let touched = self.contacts.clear_owner_by_customer(customer_id).await?;
        if touched > 0 {
            debug!(customer_id = %customer_id, touched, "cleared contact owners");
        }
        Ok(touched)
    }
}
