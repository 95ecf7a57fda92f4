//! Quota rules capping how many customers a user may own or lock
//!
//! Rules are holder-scoped and may overlap: several rules can apply to the
//! same user. Owner rules must ALL pass (most restrictive wins); lock rules
//! take the maximum configured ceiling (least restrictive ceiling wins).
//! The asymmetry is intentional; do not unify the two evaluations.

use serde::{Deserialize, Serialize};

/// Ceiling on the number of customers a user may own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerQuotaRule {
    /// Maximum owned count
    pub max_count: u64,

    /// Whether customers marked `deal` count toward the ceiling
    pub count_deal_customers: bool,
}

impl OwnerQuotaRule {
    pub fn new(max_count: u64, count_deal_customers: bool) -> Self {
        Self {
            max_count,
            count_deal_customers,
        }
    }
}

/// Ceiling on the number of customers a user may hold locked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockQuotaRule {
    /// Maximum simultaneously locked count
    pub max_count: u64,
}

impl LockQuotaRule {
    pub fn new(max_count: u64) -> Self {
        Self { max_count }
    }
}
