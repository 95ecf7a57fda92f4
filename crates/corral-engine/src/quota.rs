//! Quota evaluation
//!
//! Owner rules must ALL pass (most restrictive wins). Lock rules take the
//! maximum configured ceiling across rules. The two policies are
//! deliberately asymmetric; do not unify them.
//!
//! Both checks are advisory pre-checks against current counts, evaluated
//! without a global holder lock. Concurrent assignments can race past them
//! and transiently overshoot a ceiling; that is accepted.

use crate::error::{AllocError, Result};
use corral_store::{CustomerStore, QuotaRuleStore};
use corral_types::UserId;
use std::sync::Arc;
use tracing::debug;

/// Evaluates owner and lock quotas against current ownership counts
pub struct QuotaEvaluator {
    customers: Arc<dyn CustomerStore>,
    rules: Arc<dyn QuotaRuleStore>,
}

impl QuotaEvaluator {
    pub fn new(customers: Arc<dyn CustomerStore>, rules: Arc<dyn QuotaRuleStore>) -> Self {
        Self { customers, rules }
    }

    /// Fail with a quota error when owning `additional` more customers
    /// would break any owner rule for `user`. No rules means unbounded.
    pub async fn check_owner_quota(&self, user: &UserId, additional: u64) -> Result<()> {
        let rules = self.rules.owner_rules_for(user).await?;
        if rules.is_empty() {
            return Ok(());
        }

        let total_owned = self.customers.count_by_owner(user, None).await?;
        let deal_owned = self.customers.count_by_owner(user, Some(true)).await?;

        for rule in &rules {
            let effective = if rule.count_deal_customers {
                total_owned
            } else {
                total_owned - deal_owned
            };
            if effective + additional > rule.max_count {
                debug!(
                    user = %user,
                    effective,
                    additional,
                    max_count = rule.max_count,
                    "owner quota exceeded"
                );
                return Err(AllocError::OwnerQuotaExceeded { user: user.clone() });
            }
        }

        Ok(())
    }

    /// Fail with a quota error when `user` already holds as many locked
    /// customers as the largest configured ceiling allows. No rules means
    /// unbounded.
    pub async fn check_lock_quota(&self, user: &UserId) -> Result<()> {
        let rules = self.rules.lock_rules_for(user).await?;
        if rules.is_empty() {
            return Ok(());
        }

        let locked = self.customers.count_locked_by_owner(user).await?;
        let max_count = rules.iter().map(|r| r.max_count).max().unwrap_or(0);
        if locked >= max_count {
            debug!(user = %user, locked, max_count, "lock quota exceeded");
            return Err(AllocError::LockQuotaExceeded { user: user.clone() });
        }

        Ok(())
    }
}
