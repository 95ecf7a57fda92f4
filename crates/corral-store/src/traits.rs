//! Collaborator trait definitions
//!
//! Every trait is an async seam the allocation engine calls through an
//! `Arc<dyn ...>`. Implementations must be safe under arbitrary
//! interleaving; the conditional ownership writes on [`CustomerStore`] are
//! the serialization point for per-customer ownership races.

use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corral_types::{
    AccessLevel, AclEntry, Contact, ContactId, Customer, CustomerId, CustomerPatch, LockQuotaRule,
    OwnerQuotaRule, PoolPolicy, ResourceKind, UserId,
};
use uuid::Uuid;

/// Storage for customer records
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Insert a new customer. Fails on a duplicate id.
    async fn insert(&self, customer: Customer) -> StoreResult<()>;

    /// Get a customer by id
    async fn find_by_id(&self, id: &CustomerId) -> StoreResult<Option<Customer>>;

    /// Get the customers matching the given ids. Missing ids are simply
    /// absent from the result; callers compare lengths when absence matters.
    async fn find_by_ids(&self, ids: &[CustomerId]) -> StoreResult<Vec<Customer>>;

    /// Get a customer by exact name
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Customer>>;

    /// Apply a partial profile update. Returns false when the id is unknown.
    async fn update_fields(&self, id: &CustomerId, patch: &CustomerPatch) -> StoreResult<bool>;

    /// Set the owner only if the current owner still matches
    /// `expected_owner`. Returns the number of rows changed (0 or 1).
    ///
    /// This is the per-customer serialization point: of two concurrent
    /// ownership changes, the loser observes 0 and must not retry blindly.
    async fn update_owner_conditional(
        &self,
        id: &CustomerId,
        expected_owner: Option<&UserId>,
        new_owner: Option<&UserId>,
    ) -> StoreResult<u64>;

    /// Assign `new_owner` to every listed customer, conditional on all of
    /// them still being in the pool. All-or-nothing: if any listed customer
    /// has gained an owner (or disappeared), no rows change and 0 is
    /// returned.
    async fn batch_update_owner(
        &self,
        ids: &[CustomerId],
        new_owner: &UserId,
    ) -> StoreResult<u64>;

    /// Set the lock flag. Returns false when the id is unknown.
    async fn set_locked(&self, id: &CustomerId, locked: bool) -> StoreResult<bool>;

    /// Record a follow-up contact: advances `last_contact_at` and replaces
    /// `next_contact_at`. Returns false when the id is unknown.
    async fn record_contact(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> StoreResult<bool>;

    /// Count customers owned by `owner`, optionally filtered by deal state
    async fn count_by_owner(&self, owner: &UserId, deal_filter: Option<bool>)
        -> StoreResult<u64>;

    /// Count locked customers owned by `owner`
    async fn count_locked_by_owner(&self, owner: &UserId) -> StoreResult<u64>;

    /// List every customer that has an owner and is not locked; the
    /// reclamation sweep's candidate query
    async fn list_owned_unlocked(&self) -> StoreResult<Vec<Customer>>;

    /// Remove a customer. Returns false when the id is unknown.
    async fn delete(&self, id: &CustomerId) -> StoreResult<bool>;
}

/// Storage for access-control entries
#[async_trait]
pub trait AclStore: Send + Sync {
    /// Add a grant
    async fn grant(&self, entry: AclEntry) -> StoreResult<()>;

    /// Add several grants
    async fn grant_batch(&self, entries: Vec<AclEntry>) -> StoreResult<()>;

    /// Remove every grant on a resource, any level. Returns removed count.
    async fn revoke_all(&self, kind: ResourceKind, resource_id: &Uuid) -> StoreResult<u64>;

    /// Remove the grants of one level on a resource. Returns removed count.
    async fn revoke_level(
        &self,
        kind: ResourceKind,
        resource_id: &Uuid,
        level: AccessLevel,
    ) -> StoreResult<u64>;

    /// Move the Owner-level grant from one user to another
    async fn transfer_owner(
        &self,
        kind: ResourceKind,
        resource_id: &Uuid,
        from: &UserId,
        to: &UserId,
    ) -> StoreResult<()>;

    /// List the grants on a resource
    async fn entries_for(&self, kind: ResourceKind, resource_id: &Uuid)
        -> StoreResult<Vec<AclEntry>>;
}

/// Storage for contacts, the sub-resources coupled to a customer's owner
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Insert a new contact. Fails on a duplicate id.
    async fn insert(&self, contact: Contact) -> StoreResult<()>;

    /// Count contacts attached to a customer
    async fn count_by_customer(&self, id: &CustomerId) -> StoreResult<u64>;

    /// List contacts attached to a customer
    async fn list_by_customer(&self, id: &CustomerId) -> StoreResult<Vec<Contact>>;

    /// Clear the owner of every contact attached to a customer; the
    /// release-to-pool cascade. Returns the number of contacts touched.
    async fn clear_owner_by_customer(&self, id: &CustomerId) -> StoreResult<u64>;

    /// Remove a contact. Returns false when the id is unknown.
    async fn delete(&self, id: &ContactId) -> StoreResult<bool>;
}

/// Counter over dependent records (deals, contracts) that block deletion
#[async_trait]
pub trait ReferenceCounter: Send + Sync {
    /// Which kind of reference this counter tracks
    fn kind(&self) -> ResourceKind;

    /// Count references attached to a customer
    async fn count_by_customer(&self, id: &CustomerId) -> StoreResult<u64>;
}

/// Directory of known users (holders)
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether a user exists
    async fn exists(&self, id: &UserId) -> StoreResult<bool>;

    /// Return the subset of `ids` unknown to the directory
    async fn find_missing(&self, ids: &[UserId]) -> StoreResult<Vec<UserId>>;

    /// Human-readable name for audit context, if the user exists
    async fn display_name(&self, id: &UserId) -> StoreResult<Option<String>>;
}

/// Storage for quota rules
#[async_trait]
pub trait QuotaRuleStore: Send + Sync {
    /// Owner-count rules applying to a user; empty means unbounded
    async fn owner_rules_for(&self, user: &UserId) -> StoreResult<Vec<OwnerQuotaRule>>;

    /// Locked-count rules applying to a user; empty means unbounded
    async fn lock_rules_for(&self, user: &UserId) -> StoreResult<Vec<LockQuotaRule>>;
}

/// Storage for the global pool reclamation policy
#[async_trait]
pub trait PoolPolicyStore: Send + Sync {
    /// The current policy; `None` disables the sweep entirely
    async fn pool_policy(&self) -> StoreResult<Option<PoolPolicy>>;
}
