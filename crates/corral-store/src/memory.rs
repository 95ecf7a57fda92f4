//! In-memory implementations of the collaborator traits
//!
//! These are suitable for development and testing. Production deployments
//! should use persistent backends.
//!
//! The customer map sits behind a single `tokio::sync::RwLock` so the
//! conditional and batch ownership writes are atomic with respect to each
//! other; the ancillary stores use `DashMap`.

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    AclStore, ContactStore, CustomerStore, PoolPolicyStore, QuotaRuleStore, ReferenceCounter,
    UserDirectory,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corral_types::{
    AccessLevel, AclEntry, Contact, ContactId, Customer, CustomerId, CustomerPatch, LockQuotaRule,
    OwnerQuotaRule, PoolPolicy, ResourceKind, UserId,
};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory customer store
#[derive(Debug, Default)]
pub struct MemoryCustomerStore {
    customers: Arc<RwLock<HashMap<CustomerId, Customer>>>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn insert(&self, customer: Customer) -> StoreResult<()> {
        let mut customers = self.customers.write().await;
        if customers.contains_key(&customer.id) {
            return Err(StoreError::DuplicateCustomer(customer.id));
        }
        customers.insert(customer.id.clone(), customer);
        Ok(())
    }

    async fn find_by_id(&self, id: &CustomerId) -> StoreResult<Option<Customer>> {
        let customers = self.customers.read().await;
        Ok(customers.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[CustomerId]) -> StoreResult<Vec<Customer>> {
        let customers = self.customers.read().await;
        Ok(ids.iter().filter_map(|id| customers.get(id).cloned()).collect())
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<Customer>> {
        let customers = self.customers.read().await;
        Ok(customers.values().find(|c| c.name == name).cloned())
    }

    async fn update_fields(&self, id: &CustomerId, patch: &CustomerPatch) -> StoreResult<bool> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(id) {
            Some(customer) => {
                customer.apply_patch(patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_owner_conditional(
        &self,
        id: &CustomerId,
        expected_owner: Option<&UserId>,
        new_owner: Option<&UserId>,
    ) -> StoreResult<u64> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(id) {
            Some(customer) if customer.owner_user_id.as_ref() == expected_owner => {
                customer.owner_user_id = new_owner.cloned();
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn batch_update_owner(
        &self,
        ids: &[CustomerId],
        new_owner: &UserId,
    ) -> StoreResult<u64> {
        let mut customers = self.customers.write().await;
        // All-or-nothing: every target must still be in the pool.
        for id in ids {
            match customers.get(id) {
                Some(customer) if customer.in_pool() => {}
                _ => return Ok(0),
            }
        }
        for id in ids {
            if let Some(customer) = customers.get_mut(id) {
                customer.owner_user_id = Some(new_owner.clone());
            }
        }
        Ok(ids.len() as u64)
    }

    async fn set_locked(&self, id: &CustomerId, locked: bool) -> StoreResult<bool> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(id) {
            Some(customer) => {
                customer.locked = locked;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_contact(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> StoreResult<bool> {
        let mut customers = self.customers.write().await;
        match customers.get_mut(id) {
            Some(customer) => {
                customer.last_contact_at = Some(at);
                customer.next_contact_at = next;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_by_owner(
        &self,
        owner: &UserId,
        deal_filter: Option<bool>,
    ) -> StoreResult<u64> {
        let customers = self.customers.read().await;
        let count = customers
            .values()
            .filter(|c| c.owner_user_id.as_ref() == Some(owner))
            .filter(|c| deal_filter.map_or(true, |deal| c.deal == deal))
            .count();
        Ok(count as u64)
    }

    async fn count_locked_by_owner(&self, owner: &UserId) -> StoreResult<u64> {
        let customers = self.customers.read().await;
        let count = customers
            .values()
            .filter(|c| c.owner_user_id.as_ref() == Some(owner) && c.locked)
            .count();
        Ok(count as u64)
    }

    async fn list_owned_unlocked(&self) -> StoreResult<Vec<Customer>> {
        let customers = self.customers.read().await;
        Ok(customers
            .values()
            .filter(|c| !c.in_pool() && !c.locked)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &CustomerId) -> StoreResult<bool> {
        let mut customers = self.customers.write().await;
        Ok(customers.remove(id).is_some())
    }
}

/// In-memory ACL store, keyed by (kind, resource id)
#[derive(Debug, Default)]
pub struct MemoryAclStore {
    entries: DashMap<(ResourceKind, Uuid), Vec<AclEntry>>,
}

impl MemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AclStore for MemoryAclStore {
    async fn grant(&self, entry: AclEntry) -> StoreResult<()> {
        self.entries
            .entry((entry.kind, entry.resource_id))
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn grant_batch(&self, entries: Vec<AclEntry>) -> StoreResult<()> {
        for entry in entries {
            self.grant(entry).await?;
        }
        Ok(())
    }

    async fn revoke_all(&self, kind: ResourceKind, resource_id: &Uuid) -> StoreResult<u64> {
        match self.entries.remove(&(kind, *resource_id)) {
            Some((_, removed)) => Ok(removed.len() as u64),
            None => Ok(0),
        }
    }

    async fn revoke_level(
        &self,
        kind: ResourceKind,
        resource_id: &Uuid,
        level: AccessLevel,
    ) -> StoreResult<u64> {
        match self.entries.get_mut(&(kind, *resource_id)) {
            Some(mut entries) => {
                let before = entries.len();
                entries.retain(|e| e.level != level);
                Ok((before - entries.len()) as u64)
            }
            None => Ok(0),
        }
    }

    async fn transfer_owner(
        &self,
        kind: ResourceKind,
        resource_id: &Uuid,
        from: &UserId,
        to: &UserId,
    ) -> StoreResult<()> {
        let mut entries = self.entries.entry((kind, *resource_id)).or_default();
        entries.retain(|e| !(e.level == AccessLevel::Owner && e.user_id == *from));
        entries.push(AclEntry::owner(kind, *resource_id, to.clone()));
        Ok(())
    }

    async fn entries_for(
        &self,
        kind: ResourceKind,
        resource_id: &Uuid,
    ) -> StoreResult<Vec<AclEntry>> {
        Ok(self
            .entries
            .get(&(kind, *resource_id))
            .map(|e| e.clone())
            .unwrap_or_default())
    }
}

/// In-memory contact store
#[derive(Debug, Default)]
pub struct MemoryContactStore {
    contacts: DashMap<ContactId, Contact>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn insert(&self, contact: Contact) -> StoreResult<()> {
        if self.contacts.contains_key(&contact.id) {
            return Err(StoreError::DuplicateContact(contact.id));
        }
        self.contacts.insert(contact.id.clone(), contact);
        Ok(())
    }

    async fn count_by_customer(&self, id: &CustomerId) -> StoreResult<u64> {
        let count = self
            .contacts
            .iter()
            .filter(|entry| entry.value().customer_id == *id)
            .count();
        Ok(count as u64)
    }

    async fn list_by_customer(&self, id: &CustomerId) -> StoreResult<Vec<Contact>> {
        Ok(self
            .contacts
            .iter()
            .filter(|entry| entry.value().customer_id == *id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn clear_owner_by_customer(&self, id: &CustomerId) -> StoreResult<u64> {
        let mut touched = 0;
        for mut entry in self.contacts.iter_mut() {
            if entry.value().customer_id == *id && entry.value().owner_user_id.is_some() {
                entry.value_mut().owner_user_id = None;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn delete(&self, id: &ContactId) -> StoreResult<bool> {
        Ok(self.contacts.remove(id).is_some())
    }
}

/// In-memory reference counter for a single kind (deals, contracts)
#[derive(Debug)]
pub struct MemoryReferenceCounter {
    kind: ResourceKind,
    counts: DashMap<CustomerId, u64>,
}

impl MemoryReferenceCounter {
    pub fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            counts: DashMap::new(),
        }
    }

    pub fn deals() -> Self {
        Self::new(ResourceKind::Deal)
    }

    pub fn contracts() -> Self {
        Self::new(ResourceKind::Contract)
    }

    /// Set the reference count for a customer (test and seed helper)
    pub fn set_count(&self, id: CustomerId, count: u64) {
        if count == 0 {
            self.counts.remove(&id);
        } else {
            self.counts.insert(id, count);
        }
    }
}

#[async_trait]
impl ReferenceCounter for MemoryReferenceCounter {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn count_by_customer(&self, id: &CustomerId) -> StoreResult<u64> {
        Ok(self.counts.get(id).map(|c| *c).unwrap_or(0))
    }
}

/// In-memory user directory
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<UserId, String>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with a display name
    pub fn insert(&self, id: UserId, display_name: impl Into<String>) {
        self.users.insert(id, display_name.into());
    }

    /// Generate and register a fresh user
    pub fn register(&self, display_name: impl Into<String>) -> UserId {
        let id = UserId::generate();
        self.users.insert(id.clone(), display_name.into());
        id
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn exists(&self, id: &UserId) -> StoreResult<bool> {
        Ok(self.users.contains_key(id))
    }

    async fn find_missing(&self, ids: &[UserId]) -> StoreResult<Vec<UserId>> {
        Ok(ids
            .iter()
            .filter(|id| !self.users.contains_key(*id))
            .cloned()
            .collect())
    }

    async fn display_name(&self, id: &UserId) -> StoreResult<Option<String>> {
        Ok(self.users.get(id).map(|name| name.clone()))
    }
}

/// In-memory quota rule store
#[derive(Debug, Default)]
pub struct MemoryQuotaRules {
    owner_rules: DashMap<UserId, Vec<OwnerQuotaRule>>,
    lock_rules: DashMap<UserId, Vec<LockQuotaRule>>,
}

impl MemoryQuotaRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_owner_rule(&self, user: UserId, rule: OwnerQuotaRule) {
        self.owner_rules.entry(user).or_default().push(rule);
    }

    pub fn add_lock_rule(&self, user: UserId, rule: LockQuotaRule) {
        self.lock_rules.entry(user).or_default().push(rule);
    }
}

#[async_trait]
impl QuotaRuleStore for MemoryQuotaRules {
    async fn owner_rules_for(&self, user: &UserId) -> StoreResult<Vec<OwnerQuotaRule>> {
        Ok(self
            .owner_rules
            .get(user)
            .map(|rules| rules.clone())
            .unwrap_or_default())
    }

    async fn lock_rules_for(&self, user: &UserId) -> StoreResult<Vec<LockQuotaRule>> {
        Ok(self
            .lock_rules
            .get(user)
            .map(|rules| rules.clone())
            .unwrap_or_default())
    }
}

/// In-memory pool policy store
#[derive(Debug, Default)]
pub struct MemoryPoolPolicy {
    policy: RwLock<Option<PoolPolicy>>,
}

impl MemoryPoolPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: PoolPolicy) -> Self {
        Self {
            policy: RwLock::new(Some(policy)),
        }
    }

    pub async fn set(&self, policy: Option<PoolPolicy>) {
        *self.policy.write().await = policy;
    }
}

#[async_trait]
impl PoolPolicyStore for MemoryPoolPolicy {
    async fn pool_policy(&self) -> StoreResult<Option<PoolPolicy>> {
        Ok(self.policy.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_types::CustomerDraft;

    fn test_customer(name: &str, owner: Option<UserId>) -> Customer {
        Customer::from_draft(CustomerDraft::new(name), owner, Utc::now())
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_owner() {
        let store = MemoryCustomerStore::new();
        let alice = UserId::generate();
        let bob = UserId::generate();
        let customer = test_customer("Acme", Some(alice.clone()));
        let id = customer.id.clone();
        store.insert(customer).await.unwrap();

        // Expecting the pool state while Alice owns it: no rows change.
        let rows = store
            .update_owner_conditional(&id, None, Some(&bob))
            .await
            .unwrap();
        assert_eq!(rows, 0);

        let rows = store
            .update_owner_conditional(&id, Some(&alice), Some(&bob))
            .await
            .unwrap();
        assert_eq!(rows, 1);
        let current = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(current.owner_user_id, Some(bob));
    }

    #[tokio::test]
    async fn batch_update_owner_is_all_or_nothing() {
        let store = MemoryCustomerStore::new();
        let owner = UserId::generate();
        let pooled = test_customer("Pooled", None);
        let taken = test_customer("Taken", Some(UserId::generate()));
        let pooled_id = pooled.id.clone();
        store.insert(pooled).await.unwrap();
        store.insert(taken.clone()).await.unwrap();

        let rows = store
            .batch_update_owner(&[pooled_id.clone(), taken.id.clone()], &owner)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        assert!(store.find_by_id(&pooled_id).await.unwrap().unwrap().in_pool());

        let rows = store.batch_update_owner(&[pooled_id.clone()], &owner).await.unwrap();
        assert_eq!(rows, 1);
        let claimed = store.find_by_id(&pooled_id).await.unwrap().unwrap();
        assert_eq!(claimed.owner_user_id, Some(owner));
    }

    #[tokio::test]
    async fn count_by_owner_honors_deal_filter() {
        let store = MemoryCustomerStore::new();
        let owner = UserId::generate();
        let mut dealt = test_customer("Dealt", Some(owner.clone()));
        dealt.deal = true;
        store.insert(dealt).await.unwrap();
        store
            .insert(test_customer("Fresh", Some(owner.clone())))
            .await
            .unwrap();
        store.insert(test_customer("Pooled", None)).await.unwrap();

        assert_eq!(store.count_by_owner(&owner, None).await.unwrap(), 2);
        assert_eq!(store.count_by_owner(&owner, Some(true)).await.unwrap(), 1);
        assert_eq!(store.count_by_owner(&owner, Some(false)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn acl_revoke_level_leaves_other_levels() {
        let store = MemoryAclStore::new();
        let resource = Uuid::new_v4();
        let owner = UserId::generate();
        let reader = UserId::generate();
        store
            .grant(AclEntry::owner(ResourceKind::Customer, resource, owner))
            .await
            .unwrap();
        store
            .grant(AclEntry::new(
                ResourceKind::Customer,
                resource,
                reader,
                AccessLevel::Read,
            ))
            .await
            .unwrap();

        let removed = store
            .revoke_level(ResourceKind::Customer, &resource, AccessLevel::Owner)
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let remaining = store
            .entries_for(ResourceKind::Customer, &resource)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].level, AccessLevel::Read);

        let removed = store
            .revoke_all(ResourceKind::Customer, &resource)
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn clearing_contact_owners_touches_only_one_customer() {
        let store = MemoryContactStore::new();
        let owner = UserId::generate();
        let customer_a = CustomerId::generate();
        let customer_b = CustomerId::generate();
        store
            .insert(Contact::new(customer_a.clone(), "Ann", Some(owner.clone())))
            .await
            .unwrap();
        store
            .insert(Contact::new(customer_a.clone(), "Ben", Some(owner.clone())))
            .await
            .unwrap();
        store
            .insert(Contact::new(customer_b.clone(), "Cid", Some(owner.clone())))
            .await
            .unwrap();

        let touched = store.clear_owner_by_customer(&customer_a).await.unwrap();
        assert_eq!(touched, 2);

        for contact in store.list_by_customer(&customer_a).await.unwrap() {
            assert!(contact.owner_user_id.is_none());
        }
        let other = store.list_by_customer(&customer_b).await.unwrap();
        assert_eq!(other[0].owner_user_id, Some(owner));
    }

    #[tokio::test]
    async fn directory_reports_missing_users() {
        let directory = MemoryUserDirectory::new();
        let known = directory.register("Dana");
        let unknown = UserId::generate();

        assert!(directory.exists(&known).await.unwrap());
        let missing = directory
            .find_missing(&[known.clone(), unknown.clone()])
            .await
            .unwrap();
        assert_eq!(missing, vec![unknown]);
        assert_eq!(
            directory.display_name(&known).await.unwrap(),
            Some("Dana".to_string())
        );
    }
}
