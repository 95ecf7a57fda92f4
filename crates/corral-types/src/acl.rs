//! Access-control entries and resource kinds
//!
//! The allocator creates and deletes Owner-level entries as a side effect
//! of ownership changes. It never holds authority over Write/Read grants;
//! those belong to whatever permission surface sits above this engine.

use crate::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Access level of an ACL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    /// Full control, exactly one per owned resource
    Owner,
    /// Read and modify
    Write,
    /// Read only
    Read,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Owner => write!(f, "owner"),
            AccessLevel::Write => write!(f, "write"),
            AccessLevel::Read => write!(f, "read"),
        }
    }
}

/// Kind tag for resources referenced by ACL entries and reference checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Customer,
    Contact,
    Deal,
    Contract,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Customer => write!(f, "customer"),
            ResourceKind::Contact => write!(f, "contact"),
            ResourceKind::Deal => write!(f, "deal"),
            ResourceKind::Contract => write!(f, "contract"),
        }
    }
}

/// A single access grant on a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    /// Resource kind the grant applies to
    pub kind: ResourceKind,

    /// Raw resource identifier (kind determines the id namespace)
    pub resource_id: Uuid,

    /// Grantee
    pub user_id: UserId,

    /// Granted level
    pub level: AccessLevel,
}

impl AclEntry {
    pub fn new(kind: ResourceKind, resource_id: Uuid, user_id: UserId, level: AccessLevel) -> Self {
        Self {
            kind,
            resource_id,
            user_id,
            level,
        }
    }

    /// Owner-level grant, the only level the allocator manages itself.
    pub fn owner(kind: ResourceKind, resource_id: Uuid, user_id: UserId) -> Self {
        Self::new(kind, resource_id, user_id, AccessLevel::Owner)
    }
}
