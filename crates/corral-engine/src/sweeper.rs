//! Pool reclamation sweep
//!
//! Periodically returns neglected customers to the shared pool. Two
//! timers partition the owned, unlocked population: customers without a
//! deal expire against their creation time, customers with a deal expire
//! against their last follow-up. Locked customers are never examined.

use crate::allocator::CustomerAllocator;
use crate::context::RequestContext;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use corral_store::{CustomerStore, PoolPolicyStore};
use corral_types::{Customer, CustomerId, PoolPolicy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of one reclamation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Owned, unlocked customers examined against the timers
    pub examined: u64,

    /// Customers released back to the pool
    pub reclaimed: u64,

    /// Customers whose release failed, with the reason
    pub failures: Vec<(CustomerId, String)>,
}

/// Reclaims expired customers into the pool
pub struct PoolSweeper {
    customers: Arc<dyn CustomerStore>,
    policies: Arc<dyn PoolPolicyStore>,
    allocator: Arc<CustomerAllocator>,
}

impl PoolSweeper {
    /// Create a sweeper releasing through the given allocator
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        policies: Arc<dyn PoolPolicyStore>,
        allocator: Arc<CustomerAllocator>,
    ) -> Self {
        Self {
            customers,
            policies,
            allocator,
        }
    }

    /// Run one reclamation pass
    ///
    /// A failed release is recorded in the report and the sweep moves on;
    /// one stuck customer never stalls the rest of the pass.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepReport> {
        let policy = match self.policies.pool_policy().await? {
            Some(policy) if policy.enabled => policy,
            _ => {
                debug!("Pool reclamation disabled, nothing to sweep");
                return Ok(SweepReport::default());
            }
        };

        let candidates = self.customers.list_owned_unlocked().await?;
        let now = Utc::now();
        let ctx = RequestContext::system("pool-sweeper");

        let mut report = SweepReport {
            examined: candidates.len() as u64,
            ..Default::default()
        };
        for customer in candidates {
            if !Self::is_expired(&customer, &policy, now) {
                continue;
            }
            match self.allocator.release_to_pool(&customer.id, &ctx).await {
                Ok(()) => report.reclaimed += 1,
                Err(e) => {
                    warn!(customer_id = %customer.id, error = %e, "Failed to reclaim customer");
                    report.failures.push((customer.id, e.to_string()));
                }
            }
        }

        info!(
            examined = report.examined,
            reclaimed = report.reclaimed,
            failed = report.failures.len(),
            "Pool sweep finished"
        );
        Ok(report)
    }

    fn is_expired(customer: &Customer, policy: &PoolPolicy, now: DateTime<Utc>) -> bool {
        if customer.deal {
            now - customer.effective_last_contact() >= Duration::days(policy.contact_expire_days)
        } else {
            now - customer.created_at >= Duration::days(policy.deal_expire_days)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_audit::MemoryAuditTrail;
    use corral_store::{
        MemoryAclStore, MemoryContactStore, MemoryCustomerStore, MemoryPoolPolicy,
        MemoryQuotaRules, MemoryUserDirectory, StoreError, StoreResult,
    };
    use corral_types::{CustomerDraft, CustomerPatch, UserId};
    use serde_json::json;

    struct Harness {
        sweeper: PoolSweeper,
        customers: Arc<MemoryCustomerStore>,
        policies: Arc<MemoryPoolPolicy>,
        users: Arc<MemoryUserDirectory>,
        audit: Arc<MemoryAuditTrail>,
    }

    fn harness() -> Harness {
        let customers = Arc::new(MemoryCustomerStore::new());
        let policies = Arc::new(MemoryPoolPolicy::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let audit = Arc::new(MemoryAuditTrail::new());
        let allocator = Arc::new(CustomerAllocator::new(
            customers.clone(),
            Arc::new(MemoryAclStore::new()),
            users.clone(),
            Arc::new(MemoryContactStore::new()),
            vec![],
            Arc::new(MemoryQuotaRules::new()),
            audit.clone(),
        ));
        let sweeper = PoolSweeper::new(customers.clone(), policies.clone(), allocator);

        Harness {
            sweeper,
            customers,
            policies,
            users,
            audit,
        }
    }

    fn aged_customer(
        owner: &UserId,
        name: &str,
        created_days_ago: i64,
        deal: bool,
        last_contact_days_ago: Option<i64>,
    ) -> Customer {
        let created = Utc::now() - Duration::days(created_days_ago);
        let mut customer =
            Customer::from_draft(CustomerDraft::new(name), Some(owner.clone()), created);
        customer.deal = deal;
        customer.last_contact_at = last_contact_days_ago.map(|days| Utc::now() - Duration::days(days));
        customer
    }

    async fn owner_of(h: &Harness, id: &CustomerId) -> Option<UserId> {
        h.customers
            .find_by_id(id)
            .await
            .unwrap()
            .unwrap()
            .owner_user_id
    }

    #[tokio::test]
    async fn sweep_partitions_by_deal_state() {
        let h = harness();
        h.policies.set(Some(PoolPolicy::new(30, 14))).await;
        let alice = h.users.register("Alice");

        let stale = aged_customer(&alice, "Stale", 31, false, None);
        let fresh = aged_customer(&alice, "Fresh", 5, false, None);
        // A dealt customer is judged by follow-up recency, not age.
        let deal_recent = aged_customer(&alice, "DealRecent", 90, true, Some(10));
        let deal_quiet = aged_customer(&alice, "DealQuiet", 90, true, Some(15));

        let (stale_id, fresh_id) = (stale.id.clone(), fresh.id.clone());
        let (recent_id, quiet_id) = (deal_recent.id.clone(), deal_quiet.id.clone());
        for customer in [stale, fresh, deal_recent, deal_quiet] {
            h.customers.insert(customer).await.unwrap();
        }

        let report = h.sweeper.sweep().await.unwrap();
        assert_eq!(report.examined, 4);
        assert_eq!(report.reclaimed, 2);
        assert!(report.failures.is_empty());

        assert_eq!(owner_of(&h, &stale_id).await, None);
        assert_eq!(owner_of(&h, &quiet_id).await, None);
        assert_eq!(owner_of(&h, &fresh_id).await, Some(alice.clone()));
        assert_eq!(owner_of(&h, &recent_id).await, Some(alice));

        let events = h.audit.events_for(&stale_id);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].context.get("actor"),
            Some(&json!("system:pool-sweeper"))
        );
        assert!(events[0].actor.is_none());
    }

    #[tokio::test]
    async fn locked_customers_are_exempt() {
        let h = harness();
        h.policies.set(Some(PoolPolicy::new(30, 14))).await;
        let alice = h.users.register("Alice");

        let mut frozen = aged_customer(&alice, "Frozen", 120, false, None);
        frozen.locked = true;
        let id = frozen.id.clone();
        h.customers.insert(frozen).await.unwrap();

        let report = h.sweeper.sweep().await.unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(report.reclaimed, 0);
        assert_eq!(owner_of(&h, &id).await, Some(alice));
    }

    #[tokio::test]
    async fn disabled_policy_is_a_no_op() {
        let h = harness();
        let alice = h.users.register("Alice");
        let old = aged_customer(&alice, "Old", 365, false, None);
        let id = old.id.clone();
        h.customers.insert(old).await.unwrap();

        // No policy configured at all.
        let report = h.sweeper.sweep().await.unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(owner_of(&h, &id).await, Some(alice.clone()));

        // A policy present but switched off behaves the same.
        h.policies.set(Some(PoolPolicy::default())).await;
        let report = h.sweeper.sweep().await.unwrap();
        assert_eq!(report.examined, 0);
        assert_eq!(owner_of(&h, &id).await, Some(alice));
    }

    /// Store double whose conditional owner update fails for one chosen
    /// customer, everything else delegating to the in-memory store.
    struct FlakyStore {
        inner: MemoryCustomerStore,
        fail_for: CustomerId,
    }

    #[async_trait::async_trait]
    impl CustomerStore for FlakyStore {
        async fn insert(&self, customer: Customer) -> StoreResult<()> {
            self.inner.insert(customer).await
        }

        async fn find_by_id(&self, id: &CustomerId) -> StoreResult<Option<Customer>> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_ids(&self, ids: &[CustomerId]) -> StoreResult<Vec<Customer>> {
            self.inner.find_by_ids(ids).await
        }

        async fn find_by_name(&self, name: &str) -> StoreResult<Option<Customer>> {
            self.inner.find_by_name(name).await
        }

        async fn update_fields(&self, id: &CustomerId, patch: &CustomerPatch) -> StoreResult<bool> {
            self.inner.update_fields(id, patch).await
        }

        async fn update_owner_conditional(
            &self,
            id: &CustomerId,
            expected_owner: Option<&UserId>,
            new_owner: Option<&UserId>,
        ) -> StoreResult<u64> {
            if id == &self.fail_for {
                return Err(StoreError::Backend("write timeout".into()));
            }
            self.inner
                .update_owner_conditional(id, expected_owner, new_owner)
                .await
        }

        async fn batch_update_owner(
            &self,
            ids: &[CustomerId],
            new_owner: &UserId,
        ) -> StoreResult<u64> {
            self.inner.batch_update_owner(ids, new_owner).await
        }

        async fn set_locked(&self, id: &CustomerId, locked: bool) -> StoreResult<bool> {
            self.inner.set_locked(id, locked).await
        }

        async fn record_contact(
            &self,
            id: &CustomerId,
            at: DateTime<Utc>,
            next: Option<DateTime<Utc>>,
        ) -> StoreResult<bool> {
            self.inner.record_contact(id, at, next).await
        }

        async fn count_by_owner(
            &self,
            owner: &UserId,
            deal_filter: Option<bool>,
        ) -> StoreResult<u64> {
            self.inner.count_by_owner(owner, deal_filter).await
        }

        async fn count_locked_by_owner(&self, owner: &UserId) -> StoreResult<u64> {
            self.inner.count_locked_by_owner(owner).await
        }

        async fn list_owned_unlocked(&self) -> StoreResult<Vec<Customer>> {
            self.inner.list_owned_unlocked().await
        }

        async fn delete(&self, id: &CustomerId) -> StoreResult<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn one_stuck_customer_does_not_stall_the_sweep() {
        let users = Arc::new(MemoryUserDirectory::new());
        let alice = users.register("Alice");

        let stuck = aged_customer(&alice, "Stuck", 60, false, None);
        let smooth = aged_customer(&alice, "Smooth", 60, false, None);
        let (stuck_id, smooth_id) = (stuck.id.clone(), smooth.id.clone());

        let customers = Arc::new(FlakyStore {
            inner: MemoryCustomerStore::new(),
            fail_for: stuck_id.clone(),
        });
        customers.insert(stuck).await.unwrap();
        customers.insert(smooth).await.unwrap();

        let policies = Arc::new(MemoryPoolPolicy::with_policy(PoolPolicy::new(30, 14)));
        let allocator = Arc::new(CustomerAllocator::new(
            customers.clone(),
            Arc::new(MemoryAclStore::new()),
            users,
            Arc::new(MemoryContactStore::new()),
            vec![],
            Arc::new(MemoryQuotaRules::new()),
            Arc::new(MemoryAuditTrail::new()),
        ));
        let sweeper = PoolSweeper::new(customers.clone(), policies, allocator);

        let report = sweeper.sweep().await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, stuck_id);

        let smooth = customers.find_by_id(&smooth_id).await.unwrap().unwrap();
        assert!(smooth.in_pool());
        let stuck = customers.find_by_id(&stuck_id).await.unwrap().unwrap();
        assert_eq!(stuck.owner_user_id, Some(alice));
    }
}
