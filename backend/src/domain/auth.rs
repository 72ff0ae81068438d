//! Caller identity and the guard functions composed in front of pool
//! services.
//!
//! The identity provider authenticates callers elsewhere and hands the core a
//! [`CallerIdentity`]. Role checks happen here, before a service runs; the
//! guards return capability values that services accept instead of raw
//! identities, so the lifecycle itself never inspects roles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Pool, PoolError, UserId};

/// Role granted to an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operates the marketplace and may close any pool.
    Admin,
    /// May open pools and close their own.
    Leader,
    /// May join pools.
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::Leader => f.write_str("leader"),
            Self::Member => f.write_str("member"),
        }
    }
}

/// Pre-authenticated caller handed to the core by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerIdentity {
    /// Caller id.
    pub user_id: UserId,
    /// Caller role.
    pub role: Role,
}

impl CallerIdentity {
    /// Builds an identity.
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }
}

/// Capability to open pools, led by the wrapped user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOpener(UserId);

impl PoolOpener {
    /// User who becomes the leader of opened pools.
    pub const fn leader_id(&self) -> UserId {
        self.0
    }
}

/// Capability to close pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolCloser {
    /// May close any pool.
    Admin(UserId),
    /// May close only pools this user leads.
    Leader(UserId),
}

impl PoolCloser {
    /// Whether this capability covers `pool`.
    pub fn permits(&self, pool: &Pool) -> bool {
        match self {
            Self::Admin(_) => true,
            Self::Leader(user_id) => pool.leader_id() == *user_id,
        }
    }

    /// User exercising the capability.
    pub const fn user_id(&self) -> UserId {
        match self {
            Self::Admin(user_id) | Self::Leader(user_id) => *user_id,
        }
    }
}

/// Admits leaders and admins to open pools.
pub fn require_pool_opener(caller: &CallerIdentity) -> Result<PoolOpener, PoolError> {
    match caller.role {
        Role::Admin | Role::Leader => Ok(PoolOpener(caller.user_id)),
        Role::Member => Err(PoolError::forbidden(format!(
            "{} {} may not open pools",
            caller.role, caller.user_id
        ))),
    }
}

/// Admits leaders and admins to close pools.
pub fn require_pool_closer(caller: &CallerIdentity) -> Result<PoolCloser, PoolError> {
    match caller.role {
        Role::Admin => Ok(PoolCloser::Admin(caller.user_id)),
        Role::Leader => Ok(PoolCloser::Leader(caller.user_id)),
        Role::Member => Err(PoolError::forbidden(format!(
            "{} {} may not close pools",
            caller.role, caller.user_id
        ))),
    }
}
