//! Pool reclamation policy
//!
//! The sweep releases owned, unlocked customers back to the pool once one
//! of two expiry timers fires: un-dealt customers age out relative to their
//! creation time, dealt customers relative to their last follow-up contact.

use serde::{Deserialize, Serialize};

/// Global reclamation policy applied by the sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolPolicy {
    /// Whether the sweep runs at all
    pub enabled: bool,

    /// Days after creation before an un-dealt customer is reclaimed
    pub deal_expire_days: i64,

    /// Days since last contact before a dealt customer is reclaimed
    pub contact_expire_days: i64,
}

impl PoolPolicy {
    pub fn new(deal_expire_days: i64, contact_expire_days: i64) -> Self {
        Self {
            enabled: true,
            deal_expire_days,
            contact_expire_days,
        }
    }
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            deal_expire_days: 0,
            contact_expire_days: 0,
        }
    }
}
