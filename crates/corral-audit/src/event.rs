//! Change-event types

use chrono::{DateTime, Utc};
use corral_types::{CustomerId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Stable kind tag of a change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Customer created through the manual path
    Created,
    /// Profile fields updated
    Updated,
    /// Customer removed
    Deleted,
    /// Ownership moved between users
    Transferred,
    /// Lock flag set
    Locked,
    /// Lock flag cleared
    Unlocked,
    /// Owner cleared, customer returned to the pool
    ReleasedToPool,
    /// Claimed or assigned from the pool
    Received,
    /// Created or updated by the import reconciler
    Imported,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Updated => write!(f, "updated"),
            ChangeKind::Deleted => write!(f, "deleted"),
            ChangeKind::Transferred => write!(f, "transferred"),
            ChangeKind::Locked => write!(f, "locked"),
            ChangeKind::Unlocked => write!(f, "unlocked"),
            ChangeKind::ReleasedToPool => write!(f, "released_to_pool"),
            ChangeKind::Received => write!(f, "received"),
            ChangeKind::Imported => write!(f, "imported"),
        }
    }
}

/// A recorded change to a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Unique event ID
    pub id: Uuid,

    /// When the change happened
    pub timestamp: DateTime<Utc>,

    /// What kind of change
    pub kind: ChangeKind,

    /// The customer the change applies to
    pub customer_id: CustomerId,

    /// Acting user; `None` for background work such as the sweep
    pub actor: Option<UserId>,

    /// Human-readable description
    pub message: String,

    /// Additional context variables
    pub context: HashMap<String, serde_json::Value>,
}

impl ChangeEvent {
    /// Create an event with the current timestamp
    pub fn new(kind: ChangeKind, customer_id: CustomerId, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            customer_id,
            actor: None,
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Set the acting user
    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Add a context variable
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}
