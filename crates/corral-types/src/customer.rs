//! Customer and contact records
//!
//! A Customer is the owned resource. `owner_user_id = None` means the
//! customer sits in the shared pool and is eligible for claim.

use crate::{ContactId, CustomerId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Unique customer identifier
    pub id: CustomerId,

    /// Display name, unique within the import reconciler's view
    pub name: String,

    /// Current owner; `None` means the customer is in the pool
    pub owner_user_id: Option<UserId>,

    /// Lock flag; a locked customer may not change owner
    pub locked: bool,

    /// Whether a terminal business outcome has been reached
    pub deal: bool,

    /// Contact phone number
    pub mobile: Option<String>,

    /// Contact email address
    pub email: Option<String>,

    /// Industry classification
    pub industry: Option<String>,

    /// Free-form notes
    pub remark: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Most recent follow-up contact, if any
    pub last_contact_at: Option<DateTime<Utc>>,

    /// Scheduled next follow-up, if any
    pub next_contact_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Create a fresh, unlocked, un-dealt customer from draft fields.
    pub fn from_draft(draft: CustomerDraft, owner: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::generate(),
            name: draft.name,
            owner_user_id: owner,
            locked: false,
            deal: false,
            mobile: draft.mobile,
            email: draft.email,
            industry: draft.industry,
            remark: draft.remark,
            created_at: now,
            last_contact_at: Some(now),
            next_contact_at: None,
        }
    }

    /// Whether the customer is in the pool (has no owner).
    pub fn in_pool(&self) -> bool {
        self.owner_user_id.is_none()
    }

    /// Last contact time used by the reclamation timers, falling back to
    /// the creation time when no follow-up was ever recorded.
    pub fn effective_last_contact(&self) -> DateTime<Utc> {
        self.last_contact_at.unwrap_or(self.created_at)
    }

    /// Apply a partial field update, leaving ownership, lock, and deal
    /// state untouched.
    pub fn apply_patch(&mut self, patch: &CustomerPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(mobile) = &patch.mobile {
            self.mobile = Some(mobile.clone());
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(industry) = &patch.industry {
            self.industry = Some(industry.clone());
        }
        if let Some(remark) = &patch.remark {
            self.remark = Some(remark.clone());
        }
    }
}

/// Fields for creating a new customer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDraft {
    pub name: String,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub industry: Option<String>,
    pub remark: Option<String>,
}

impl CustomerDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial update of customer profile fields
///
/// `None` fields are left untouched. Ownership, lock, and deal state are
/// deliberately absent; those mutate only through allocator operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub industry: Option<String>,
    pub remark: Option<String>,
}

impl CustomerPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.mobile.is_none()
            && self.email.is_none()
            && self.industry.is_none()
            && self.remark.is_none()
    }
}

/// A contact attached to a customer
///
/// Contact ownership historically mirrors the parent customer's owner;
/// releasing a customer to the pool clears its contacts' owners too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Unique contact identifier
    pub id: ContactId,

    /// Parent customer
    pub customer_id: CustomerId,

    /// Display name
    pub name: String,

    /// Current owner, kept in sync with the parent on release
    pub owner_user_id: Option<UserId>,
}

impl Contact {
    pub fn new(customer_id: CustomerId, name: impl Into<String>, owner: Option<UserId>) -> Self {
        Self {
            id: ContactId::generate(),
            customer_id,
            name: name.into(),
            owner_user_id: owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_from_draft_starts_unlocked_and_undealt() {
        let now = Utc::now();
        let owner = UserId::generate();
        let customer =
            Customer::from_draft(CustomerDraft::new("Acme"), Some(owner.clone()), now);

        assert_eq!(customer.name, "Acme");
        assert_eq!(customer.owner_user_id, Some(owner));
        assert!(!customer.locked);
        assert!(!customer.deal);
        assert_eq!(customer.created_at, now);
        assert_eq!(customer.last_contact_at, Some(now));
        assert!(customer.next_contact_at.is_none());
        assert!(!customer.in_pool());
    }

    #[test]
    fn test_effective_last_contact_falls_back_to_creation() {
        let now = Utc::now();
        let mut customer = Customer::from_draft(CustomerDraft::new("Acme"), None, now);
        assert!(customer.in_pool());

        customer.last_contact_at = None;
        assert_eq!(customer.effective_last_contact(), now);

        let later = now + Duration::days(3);
        customer.last_contact_at = Some(later);
        assert_eq!(customer.effective_last_contact(), later);
    }

    #[test]
    fn test_patch_touches_only_set_fields() {
        let mut customer =
            Customer::from_draft(CustomerDraft::new("Acme"), None, Utc::now());
        customer.mobile = Some("123".to_string());

        let patch = CustomerPatch {
            industry: Some("logistics".to_string()),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        customer.apply_patch(&patch);

        assert_eq!(customer.name, "Acme");
        assert_eq!(customer.mobile.as_deref(), Some("123"));
        assert_eq!(customer.industry.as_deref(), Some("logistics"));
        assert!(CustomerPatch::default().is_empty());
    }
}
