//! Request context for allocator operations
//!
//! The context carries who is making a request and when, for permission
//! gates, lock-quota attribution, and audit actor fields.

use chrono::{DateTime, Utc};
use corral_types::UserId;
use uuid::Uuid;

/// Context for an allocator request
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique request ID for tracing
    pub request_id: Uuid,
    /// Actor making the request
    pub actor: Actor,
    /// Request timestamp
    pub timestamp: DateTime<Utc>,
}

/// Actor making an allocator request
#[derive(Debug, Clone)]
pub enum Actor {
    /// An interactive user
    User {
        /// Directory identity
        id: UserId,
        /// Whether the user may reassign customers to others
        admin: bool,
    },
    /// Internal background work (the sweep)
    System {
        /// Component name
        component: String,
    },
}

impl RequestContext {
    /// Create a new request context
    pub fn new(actor: Actor) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            actor,
            timestamp: Utc::now(),
        }
    }

    /// Context for a regular user
    pub fn user(id: UserId) -> Self {
        Self::new(Actor::User { id, admin: false })
    }

    /// Context for an administrative user
    pub fn admin(id: UserId) -> Self {
        Self::new(Actor::User { id, admin: true })
    }

    /// Context for internal operations
    pub fn system(component: impl Into<String>) -> Self {
        Self::new(Actor::System {
            component: component.into(),
        })
    }

    /// The acting user, if the actor is one
    pub fn user_id(&self) -> Option<&UserId> {
        match &self.actor {
            Actor::User { id, .. } => Some(id),
            Actor::System { .. } => None,
        }
    }

    /// Whether the actor may perform administrative reassignment
    pub fn is_admin(&self) -> bool {
        match &self.actor {
            Actor::User { admin, .. } => *admin,
            Actor::System { .. } => true, // System has all capabilities
        }
    }

    /// The actor's identity string for audit context
    pub fn actor_id(&self) -> String {
        match &self.actor {
            Actor::User { id, .. } => id.to_string(),
            Actor::System { component } => format!("system:{}", component),
        }
    }
}
