//! Customer allocator
//!
//! The allocator is the single entry point for every ownership mutation.
//! Each operation follows the same shape: explicit precondition checks,
//! the storage mutation (conditional where ownership changes), ACL
//! synchronization, then fire-and-forget audit emission. ACL and audit
//! failures after the core mutation has committed are logged, never
//! propagated; the customer record is the source of truth and a missing
//! ACL entry can be re-derived from it.

use crate::cascade::CascadeSync;
use crate::context::RequestContext;
use crate::error::{AllocError, Result};
use crate::quota::QuotaEvaluator;
use chrono::{DateTime, Utc};
use corral_audit::{AuditTrail, ChangeEvent, ChangeKind};
use corral_store::{
    AclStore, ContactStore, CustomerStore, QuotaRuleStore, ReferenceCounter, UserDirectory,
};
use corral_types::{
    AccessLevel, AclEntry, Customer, CustomerDraft, CustomerId, CustomerPatch, ResourceKind,
    UserId,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Ownership state-transition engine for customers
pub struct CustomerAllocator {
    /// Customer records
    customers: Arc<dyn CustomerStore>,

    /// Access-control entries, kept in sync with ownership
    acl: Arc<dyn AclStore>,

    /// Holder directory
    users: Arc<dyn UserDirectory>,

    /// Contacts, checked first on delete and cascaded on release
    contacts: Arc<dyn ContactStore>,

    /// Reference counters consulted on delete, in check order
    references: Vec<Arc<dyn ReferenceCounter>>,

    /// Quota evaluator
    quotas: QuotaEvaluator,

    /// Release-side cascade
    cascade: CascadeSync,

    /// Change-event trail
    audit: Arc<dyn AuditTrail>,
}

impl CustomerAllocator {
    /// Create a new allocator with all collaborators
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        acl: Arc<dyn AclStore>,
        users: Arc<dyn UserDirectory>,
        contacts: Arc<dyn ContactStore>,
        references: Vec<Arc<dyn ReferenceCounter>>,
        quota_rules: Arc<dyn QuotaRuleStore>,
        audit: Arc<dyn AuditTrail>,
    ) -> Self {
        let quotas = QuotaEvaluator::new(customers.clone(), quota_rules);
        let cascade = CascadeSync::new(contacts.clone());

        Self {
            customers,
            acl,
            users,
            contacts,
            references,
            quotas,
            cascade,
            audit,
        }
    }

    // ========== Creation and Profile ==========

    /// Create a customer owned by `owner`
    #[instrument(skip(self, draft, ctx), fields(name = %draft.name, owner = %owner))]
    pub async fn create(
        &self,
        draft: CustomerDraft,
        owner: &UserId,
        ctx: &RequestContext,
    ) -> Result<Customer> {
        let customer = self.create_unaudited(draft, Some(owner.clone()), ctx).await?;

        self.emit(
            ChangeEvent::new(
                ChangeKind::Created,
                customer.id.clone(),
                format!("created customer {}", customer.name),
            )
            .with_context("owner", json!(owner.to_string())),
            ctx,
        )
        .await;
        info!(customer_id = %customer.id, "Customer created");

        Ok(customer)
    }

    /// Creation path shared with the import reconciler: validates, quota
    /// checks owned creations, persists, grants the owner ACL entry. Emits
    /// no audit event; callers decide between Created and Imported.
    pub(crate) async fn create_unaudited(
        &self,
        draft: CustomerDraft,
        owner: Option<UserId>,
        ctx: &RequestContext,
    ) -> Result<Customer> {
        if draft.name.trim().is_empty() {
            return Err(AllocError::ValidationFailed(
                "customer name is required".into(),
            ));
        }
        if let Some(owner) = &owner {
            self.validate_user(owner).await?;
            self.quotas.check_owner_quota(owner, 1).await?;
        }

        let customer = Customer::from_draft(draft, owner.clone(), ctx.timestamp);
        self.customers.insert(customer.clone()).await?;

        if let Some(owner) = &owner {
            self.grant_owner_acl(&customer.id, owner).await;
        }

        Ok(customer)
    }

    /// Update profile fields, preserving ownership, lock, and deal state
    #[instrument(skip(self, patch, ctx), fields(customer_id = %id))]
    pub async fn update(
        &self,
        id: &CustomerId,
        patch: CustomerPatch,
        ctx: &RequestContext,
    ) -> Result<()> {
        if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(AllocError::ValidationFailed(
                "customer name cannot be cleared".into(),
            ));
        }

        let existing = self.require_customer(id).await?;
        if !self.customers.update_fields(id, &patch).await? {
            return Err(AllocError::NotFound(id.clone()));
        }

        self.emit(
            ChangeEvent::new(
                ChangeKind::Updated,
                id.clone(),
                format!("updated customer {}", existing.name),
            ),
            ctx,
        )
        .await;
        info!(customer_id = %id, "Customer updated");

        Ok(())
    }

    /// Record a follow-up: advances the last-contact time and replaces the
    /// scheduled next contact
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn record_follow_up(
        &self,
        id: &CustomerId,
        at: DateTime<Utc>,
        next: Option<DateTime<Utc>>,
    ) -> Result<()> {
        if !self.customers.record_contact(id, at, next).await? {
            return Err(AllocError::NotFound(id.clone()));
        }
        debug!(customer_id = %id, "Follow-up recorded");
        Ok(())
    }

    // ========== Pool Movement ==========

    /// Claim pool customers for the acting user
    #[instrument(skip(self, ids, ctx), fields(count = ids.len()))]
    pub async fn claim(&self, ids: &[CustomerId], ctx: &RequestContext) -> Result<()> {
        let target = ctx.user_id().cloned().ok_or_else(|| {
            AllocError::PermissionDenied("claiming requires a user actor".into())
        })?;
        self.receive(ids, &target, true, ctx).await
    }

    /// Bulk claim of pool customers, optionally assigning them to another
    /// user. Assignment to someone other than the caller requires the
    /// administrative capability.
    ///
    /// All checks run against the whole batch before anything mutates:
    /// ids must be distinct, every id must resolve, every customer must be
    /// unowned, unlocked, and un-dealt, and the aggregate owner quota must
    /// fit. The ownership write itself is one all-or-nothing batch
    /// conditional on pool state, so a concurrent claim never splits the
    /// batch.
    #[instrument(skip(self, ids, ctx), fields(target = %target, count = ids.len(), self_receive))]
    pub async fn receive(
        &self,
        ids: &[CustomerId],
        target: &UserId,
        self_receive: bool,
        ctx: &RequestContext,
    ) -> Result<()> {
        if ids.is_empty() {
            return Err(AllocError::ValidationFailed(
                "no customers given to receive".into(),
            ));
        }
        let distinct: HashSet<&CustomerId> = ids.iter().collect();
        if distinct.len() != ids.len() {
            // A repeated id would count twice against the quota and emit a
            // duplicate audit event; treat it as malformed input.
            return Err(AllocError::ValidationFailed(
                "duplicate customer ids in the batch".into(),
            ));
        }
        if !self_receive && !ctx.is_admin() {
            return Err(AllocError::PermissionDenied(
                "assigning customers to another user requires administrative capability".into(),
            ));
        }
        self.validate_user(target).await?;

        let customers = self.customers.find_by_ids(ids).await?;
        if customers.len() != ids.len() {
            let found: HashSet<&CustomerId> = customers.iter().map(|c| &c.id).collect();
            // All-or-nothing: one unknown id fails the call before any write.
            for id in ids {
                if !found.contains(id) {
                    return Err(AllocError::NotFound(id.clone()));
                }
            }
        }

        for customer in &customers {
            if !customer.in_pool() {
                return Err(AllocError::OwnerExists {
                    name: customer.name.clone(),
                });
            }
            if customer.locked {
                return Err(AllocError::Locked {
                    name: customer.name.clone(),
                    action: "receive",
                });
            }
            if customer.deal {
                return Err(AllocError::AlreadyDeal {
                    name: customer.name.clone(),
                });
            }
        }

        self.quotas
            .check_owner_quota(target, ids.len() as u64)
            .await?;

        let rows = self.customers.batch_update_owner(ids, target).await?;
        if rows == 0 {
            // A concurrent claim won at least one of the customers between
            // our snapshot and the write.
            let current = self.customers.find_by_ids(ids).await?;
            if let Some(taken) = current.iter().find(|c| !c.in_pool()) {
                return Err(AllocError::OwnerExists {
                    name: taken.name.clone(),
                });
            }
            return Err(AllocError::OwnerUpdateConflict(ids[0].clone()));
        }

        let entries = ids
            .iter()
            .map(|id| AclEntry::owner(ResourceKind::Customer, *id.as_uuid(), target.clone()))
            .collect();
        if let Err(e) = self.acl.grant_batch(entries).await {
            warn!(target = %target, error = %e, "Failed to grant owner ACL entries");
        }

        let target_name = if self_receive {
            None
        } else {
            self.users.display_name(target).await.ok().flatten()
        };
        for customer in &customers {
            let message = if self_receive {
                format!("received customer {} from the pool", customer.name)
            } else {
                format!("assigned customer {} to {}", customer.name, target)
            };
            let mut event = ChangeEvent::new(ChangeKind::Received, customer.id.clone(), message)
                .with_context("target", json!(target.to_string()));
            if let Some(name) = &target_name {
                event = event.with_context("target_display_name", json!(name));
            }
            self.emit(event, ctx).await;
        }
        info!(count = customers.len(), target = %target, "Customers received from the pool");

        Ok(())
    }

    /// Transfer ownership of a customer to another user
    #[instrument(skip(self, ctx), fields(customer_id = %id, new_owner = %new_owner))]
    pub async fn transfer(
        &self,
        id: &CustomerId,
        new_owner: &UserId,
        ctx: &RequestContext,
    ) -> Result<()> {
        let customer = self.require_customer(id).await?;
        if customer.locked {
            return Err(AllocError::Locked {
                name: customer.name,
                action: "transfer",
            });
        }
        self.validate_user(new_owner).await?;
        self.quotas.check_owner_quota(new_owner, 1).await?;

        let previous = customer.owner_user_id.clone();
        let rows = self
            .customers
            .update_owner_conditional(id, previous.as_ref(), Some(new_owner))
            .await?;
        if rows == 0 {
            return Err(AllocError::OwnerUpdateConflict(id.clone()));
        }

        match &previous {
            Some(old) => self.move_owner_acl(id, old, new_owner).await,
            None => self.grant_owner_acl(id, new_owner).await,
        }

        self.emit(
            ChangeEvent::new(
                ChangeKind::Transferred,
                id.clone(),
                format!("transferred customer {} to {}", customer.name, new_owner),
            )
            .with_context("new_owner", json!(new_owner.to_string())),
            ctx,
        )
        .await;
        info!(customer_id = %id, new_owner = %new_owner, "Customer transferred");

        Ok(())
    }

    /// Release an owned customer back to the pool
    #[instrument(skip(self, ctx), fields(customer_id = %id))]
    pub async fn release_to_pool(&self, id: &CustomerId, ctx: &RequestContext) -> Result<()> {
        let customer = self.require_customer(id).await?;
        let owner = match &customer.owner_user_id {
            Some(owner) => owner.clone(),
            None => {
                return Err(AllocError::InPool {
                    name: customer.name,
                })
            }
        };
        if customer.locked {
            return Err(AllocError::Locked {
                name: customer.name,
                action: "release to the pool",
            });
        }

        let rows = self
            .customers
            .update_owner_conditional(id, Some(&owner), None)
            .await?;
        if rows == 0 {
            return Err(AllocError::OwnerUpdateConflict(id.clone()));
        }

        // Only the Owner-level grant goes; Write/Read grants survive the
        // trip through the pool.
        if let Err(e) = self
            .acl
            .revoke_level(ResourceKind::Customer, id.as_uuid(), AccessLevel::Owner)
            .await
        {
            warn!(customer_id = %id, error = %e, "Failed to revoke owner ACL entries");
        }

        if let Err(e) = self.cascade.on_release_to_pool(id).await {
            warn!(customer_id = %id, error = %e, "Release cascade failed");
        }

        self.emit(
            ChangeEvent::new(
                ChangeKind::ReleasedToPool,
                id.clone(),
                format!("released customer {} to the pool", customer.name),
            )
            .with_context("previous_owner", json!(owner.to_string())),
            ctx,
        )
        .await;
        info!(customer_id = %id, previous_owner = %owner, "Customer released to the pool");

        Ok(())
    }

    // ========== Lock ==========

    /// Set or clear the lock flag. A no-op toggle is rejected, not
    /// silently accepted.
    #[instrument(skip(self, ctx), fields(customer_id = %id, desired))]
    pub async fn toggle_lock(
        &self,
        id: &CustomerId,
        desired: bool,
        ctx: &RequestContext,
    ) -> Result<()> {
        let customer = self.require_customer(id).await?;
        if customer.locked == desired {
            return Err(if desired {
                AllocError::AlreadyLocked {
                    name: customer.name,
                }
            } else {
                AllocError::AlreadyUnlocked {
                    name: customer.name,
                }
            });
        }

        if desired {
            // The lock quota is attributed to the acting user; background
            // actors are not subject to it.
            if let Some(user) = ctx.user_id() {
                self.quotas.check_lock_quota(user).await?;
            }
        }

        if !self.customers.set_locked(id, desired).await? {
            return Err(AllocError::NotFound(id.clone()));
        }

        let (kind, verb) = if desired {
            (ChangeKind::Locked, "locked")
        } else {
            (ChangeKind::Unlocked, "unlocked")
        };
        self.emit(
            ChangeEvent::new(kind, id.clone(), format!("{} customer {}", verb, customer.name)),
            ctx,
        )
        .await;
        info!(customer_id = %id, locked = desired, "Customer lock toggled");

        Ok(())
    }

    // ========== Deletion ==========

    /// Delete a customer with no dependent references
    #[instrument(skip(self, ctx), fields(customer_id = %id))]
    pub async fn delete(&self, id: &CustomerId, ctx: &RequestContext) -> Result<()> {
        let customer = self.require_customer(id).await?;

        // Fixed check order: contacts first, then the registered counters.
        if self.contacts.count_by_customer(id).await? > 0 {
            return Err(AllocError::ReferenceExists {
                kind: ResourceKind::Contact,
            });
        }
        for counter in &self.references {
            if counter.count_by_customer(id).await? > 0 {
                return Err(AllocError::ReferenceExists {
                    kind: counter.kind(),
                });
            }
        }

        if !self.customers.delete(id).await? {
            return Err(AllocError::NotFound(id.clone()));
        }

        if let Err(e) = self.acl.revoke_all(ResourceKind::Customer, id.as_uuid()).await {
            warn!(customer_id = %id, error = %e, "Failed to revoke ACL entries");
        }

        self.emit(
            ChangeEvent::new(
                ChangeKind::Deleted,
                id.clone(),
                format!("deleted customer {}", customer.name),
            ),
            ctx,
        )
        .await;
        info!(customer_id = %id, "Customer deleted");

        Ok(())
    }

    // ========== Reads ==========

    /// Get a customer by id
    pub async fn get(&self, id: &CustomerId) -> Result<Option<Customer>> {
        Ok(self.customers.find_by_id(id).await?)
    }

    /// Get the customers matching the given ids
    pub async fn list(&self, ids: &[CustomerId]) -> Result<Vec<Customer>> {
        Ok(self.customers.find_by_ids(ids).await?)
    }

    // ========== Internal ==========

    async fn require_customer(&self, id: &CustomerId) -> Result<Customer> {
        self.customers
            .find_by_id(id)
            .await?
            .ok_or_else(|| AllocError::NotFound(id.clone()))
    }

    async fn validate_user(&self, user: &UserId) -> Result<()> {
        if !self.users.exists(user).await? {
            return Err(AllocError::UserNotFound(user.clone()));
        }
        Ok(())
    }

    async fn grant_owner_acl(&self, id: &CustomerId, owner: &UserId) {
        let entry = AclEntry::owner(ResourceKind::Customer, *id.as_uuid(), owner.clone());
        if let Err(e) = self.acl.grant(entry).await {
            warn!(customer_id = %id, error = %e, "Failed to grant owner ACL entry");
        }
    }

    async fn move_owner_acl(&self, id: &CustomerId, from: &UserId, to: &UserId) {
        if let Err(e) = self
            .acl
            .transfer_owner(ResourceKind::Customer, id.as_uuid(), from, to)
            .await
        {
            warn!(customer_id = %id, error = %e, "Failed to move owner ACL entry");
        }
    }

    async fn emit(&self, mut event: ChangeEvent, ctx: &RequestContext) {
        if let Some(user) = ctx.user_id() {
            event = event.with_actor(user.clone());
        }
        event = event
            .with_context("actor", json!(ctx.actor_id()))
            .with_context("request_id", json!(ctx.request_id.to_string()));
        if let Err(e) = self.audit.record(event).await {
            warn!(error = %e, "Failed to record audit event");
        }
    }
}
