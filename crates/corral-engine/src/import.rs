//! Bulk import reconciler
//!
//! Reconciles an external customer list against the store by name. Each
//! row is validated and applied independently; a bad row lands in the
//! failure list with a reason instead of aborting the batch.

use crate::allocator::CustomerAllocator;
use crate::context::RequestContext;
use crate::error::{AllocError, Result};
use corral_audit::{AuditTrail, ChangeEvent, ChangeKind};
use corral_store::CustomerStore;
use corral_types::{CustomerDraft, CustomerId, CustomerPatch, UserId};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// One row of an import batch, keyed by customer name
#[derive(Debug, Clone, Serialize)]
pub struct ImportItem {
    /// Customer name, the match key
    pub name: String,

    /// Mobile number
    pub mobile: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Industry label
    pub industry: Option<String>,

    /// Free-form notes
    pub remark: Option<String>,
}

impl ImportItem {
    /// Create an item carrying only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mobile: None,
            email: None,
            industry: None,
            remark: None,
        }
    }

    fn draft(&self) -> CustomerDraft {
        let mut draft = CustomerDraft::new(self.name.clone());
        draft.mobile = self.mobile.clone();
        draft.email = self.email.clone();
        draft.industry = self.industry.clone();
        draft.remark = self.remark.clone();
        draft
    }

    fn patch(&self) -> CustomerPatch {
        CustomerPatch {
            // The name matched an existing record; never rewrite the key.
            name: None,
            mobile: self.mobile.clone(),
            email: self.email.clone(),
            industry: self.industry.clone(),
            remark: self.remark.clone(),
        }
    }
}

/// Per-batch import result with per-name outcomes
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportOutcome {
    /// Names created as new customers
    pub created: Vec<String>,

    /// Names matched and updated in place
    pub updated: Vec<String>,

    /// Names that failed, with the reason
    pub failed: Vec<(String, String)>,
}

impl ImportOutcome {
    /// Failure reason recorded for `name`, if it failed
    pub fn failure_reason(&self, name: &str) -> Option<&str> {
        self.failed
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, reason)| reason.as_str())
    }
}

enum ItemAction {
    Created,
    Updated,
}

/// Reconciles import batches against the customer store
pub struct ImportReconciler {
    allocator: Arc<CustomerAllocator>,
    customers: Arc<dyn CustomerStore>,
    audit: Arc<dyn AuditTrail>,
}

impl ImportReconciler {
    /// Create a reconciler sharing the allocator's creation path
    pub fn new(
        allocator: Arc<CustomerAllocator>,
        customers: Arc<dyn CustomerStore>,
        audit: Arc<dyn AuditTrail>,
    ) -> Self {
        Self {
            allocator,
            customers,
            audit,
        }
    }

    /// Reconcile a batch. New names become customers owned by
    /// `default_owner` (or pool customers when `None`); matched names are
    /// updated in place when `allow_update` permits it.
    #[instrument(skip(self, items, ctx), fields(count = items.len(), allow_update))]
    pub async fn reconcile(
        &self,
        items: &[ImportItem],
        default_owner: Option<&UserId>,
        allow_update: bool,
        ctx: &RequestContext,
    ) -> Result<ImportOutcome> {
        if items.is_empty() {
            return Err(AllocError::ValidationFailed("import batch is empty".into()));
        }

        let mut outcome = ImportOutcome::default();
        for item in items {
            match self
                .reconcile_item(item, default_owner, allow_update, ctx)
                .await
            {
                Ok(ItemAction::Created) => outcome.created.push(item.name.clone()),
                Ok(ItemAction::Updated) => outcome.updated.push(item.name.clone()),
                Err(e) => {
                    warn!(name = %item.name, error = %e, "Import row failed");
                    outcome.failed.push((item.name.clone(), e.to_string()));
                }
            }
        }

        info!(
            created = outcome.created.len(),
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            "Import batch reconciled"
        );
        Ok(outcome)
    }

    async fn reconcile_item(
        &self,
        item: &ImportItem,
        default_owner: Option<&UserId>,
        allow_update: bool,
        ctx: &RequestContext,
    ) -> Result<ItemAction> {
        if item.name.trim().is_empty() {
            return Err(AllocError::ValidationFailed(
                "customer name is required".into(),
            ));
        }

        match self.customers.find_by_name(&item.name).await? {
            None => {
                let customer = self
                    .allocator
                    .create_unaudited(item.draft(), default_owner.cloned(), ctx)
                    .await?;
                self.emit_imported(&customer.id, &item.name, false, ctx).await;
                Ok(ItemAction::Created)
            }
            Some(existing) => {
                if !allow_update {
                    return Err(AllocError::ValidationFailed(format!(
                        "customer name already exists: {}",
                        item.name
                    )));
                }
                if !self.customers.update_fields(&existing.id, &item.patch()).await? {
                    return Err(AllocError::NotFound(existing.id.clone()));
                }
                self.emit_imported(&existing.id, &item.name, true, ctx).await;
                Ok(ItemAction::Updated)
            }
        }
    }

    async fn emit_imported(
        &self,
        id: &CustomerId,
        name: &str,
        updated: bool,
        ctx: &RequestContext,
    ) {
        let verb = if updated { "updated" } else { "created" };
        let mut event = ChangeEvent::new(
            ChangeKind::Imported,
            id.clone(),
            format!("import {} customer {}", verb, name),
        )
        .with_context("updated", json!(updated))
        .with_context("request_id", json!(ctx.request_id.to_string()));
        if let Some(user) = ctx.user_id() {
            event = event.with_actor(user.clone());
        }
        if let Err(e) = self.audit.record(event).await {
            warn!(customer_id = %id, error = %e, "Failed to record import audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corral_audit::MemoryAuditTrail;
    use corral_store::{
        MemoryAclStore, MemoryContactStore, MemoryCustomerStore, MemoryQuotaRules,
        MemoryUserDirectory,
    };
    use corral_types::OwnerQuotaRule;

    struct Harness {
        reconciler: ImportReconciler,
        customers: Arc<MemoryCustomerStore>,
        users: Arc<MemoryUserDirectory>,
        rules: Arc<MemoryQuotaRules>,
        audit: Arc<MemoryAuditTrail>,
    }

    fn harness() -> Harness {
        let customers = Arc::new(MemoryCustomerStore::new());
        let users = Arc::new(MemoryUserDirectory::new());
        let rules = Arc::new(MemoryQuotaRules::new());
        let audit = Arc::new(MemoryAuditTrail::new());
        let allocator = Arc::new(CustomerAllocator::new(
            customers.clone(),
            Arc::new(MemoryAclStore::new()),
            users.clone(),
            Arc::new(MemoryContactStore::new()),
            vec![],
            rules.clone(),
            audit.clone(),
        ));
        let reconciler = ImportReconciler::new(allocator, customers.clone(), audit.clone());

        Harness {
            reconciler,
            customers,
            users,
            rules,
            audit,
        }
    }

    fn item(name: &str, industry: Option<&str>) -> ImportItem {
        let mut item = ImportItem::new(name);
        item.industry = industry.map(String::from);
        item
    }

    #[tokio::test]
    async fn creates_new_and_updates_existing() {
        let h = harness();
        let alice = h.users.register("Alice");
        let ctx = RequestContext::user(alice.clone());

        let first = h
            .reconciler
            .reconcile(&[item("Acme", None)], Some(&alice), true, &ctx)
            .await
            .unwrap();
        assert_eq!(first.created, vec!["Acme".to_string()]);
        assert!(first.updated.is_empty());

        let second = h
            .reconciler
            .reconcile(&[item("Acme", Some("logistics"))], Some(&alice), true, &ctx)
            .await
            .unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.updated, vec!["Acme".to_string()]);

        let stored = h.customers.find_by_name("Acme").await.unwrap().unwrap();
        assert_eq!(stored.industry.as_deref(), Some("logistics"));
        assert_eq!(stored.owner_user_id, Some(alice));
    }

    #[tokio::test]
    async fn duplicate_name_fails_when_updates_disallowed() {
        let h = harness();
        let alice = h.users.register("Alice");
        let ctx = RequestContext::user(alice.clone());

        h.reconciler
            .reconcile(&[item("Acme", None)], Some(&alice), false, &ctx)
            .await
            .unwrap();
        let outcome = h
            .reconciler
            .reconcile(&[item("Acme", Some("retail"))], Some(&alice), false, &ctx)
            .await
            .unwrap();

        assert!(outcome.created.is_empty());
        assert!(outcome
            .failure_reason("Acme")
            .is_some_and(|reason| reason.contains("already exists")));

        // The existing record is untouched.
        let stored = h.customers.find_by_name("Acme").await.unwrap().unwrap();
        assert!(stored.industry.is_none());
    }

    #[tokio::test]
    async fn bad_row_does_not_abort_the_batch() {
        let h = harness();
        let alice = h.users.register("Alice");
        let ctx = RequestContext::user(alice.clone());

        let outcome = h
            .reconciler
            .reconcile(
                &[item("First", None), item("  ", None), item("Third", None)],
                Some(&alice),
                true,
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome
            .failure_reason("  ")
            .is_some_and(|reason| reason.contains("name is required")));
    }

    #[tokio::test]
    async fn quota_failures_are_per_row() {
        let h = harness();
        let alice = h.users.register("Alice");
        h.rules
            .add_owner_rule(alice.clone(), OwnerQuotaRule::new(1, true));
        let ctx = RequestContext::user(alice.clone());

        let outcome = h
            .reconciler
            .reconcile(
                &[item("First", None), item("Second", None)],
                Some(&alice),
                true,
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(outcome.created, vec!["First".to_string()]);
        assert_eq!(outcome.failed.len(), 1);
        assert!(outcome.failure_reason("Second").is_some());
    }

    #[tokio::test]
    async fn ownerless_import_lands_in_pool_and_skips_quota() {
        let h = harness();
        let alice = h.users.register("Alice");
        h.rules
            .add_owner_rule(alice.clone(), OwnerQuotaRule::new(0, true));
        let ctx = RequestContext::user(alice.clone());

        let outcome = h
            .reconciler
            .reconcile(
                &[item("First", None), item("Second", None)],
                None,
                true,
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(outcome.created.len(), 2);
        assert!(outcome.failed.is_empty());

        let stored = h.customers.find_by_name("First").await.unwrap().unwrap();
        assert!(stored.in_pool());
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let h = harness();
        let alice = h.users.register("Alice");
        let ctx = RequestContext::user(alice.clone());

        let err = h
            .reconciler
            .reconcile(&[], Some(&alice), true, &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[tokio::test]
    async fn import_rows_are_audited() {
        let h = harness();
        let alice = h.users.register("Alice");
        let ctx = RequestContext::user(alice.clone());

        h.reconciler
            .reconcile(&[item("Acme", None)], Some(&alice), true, &ctx)
            .await
            .unwrap();
        h.reconciler
            .reconcile(&[item("Acme", Some("retail"))], Some(&alice), true, &ctx)
            .await
            .unwrap();

        let events = h.audit.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == ChangeKind::Imported));
        assert_eq!(events[0].context.get("updated"), Some(&json!(false)));
        assert_eq!(events[1].context.get("updated"), Some(&json!(true)));
    }
}
