//! Group-buy pool aggregate.
//!
//! A pool collects pledged quantity towards a target before a deadline. The
//! aggregate itself is a plain snapshot; status transitions live in
//! [`lifecycle`] and read-only projections in [`metrics`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PoolId, ProductId, UserId};

pub mod lifecycle;
pub mod metrics;

pub use lifecycle::{JoinAcceptance, LifecycleError};
pub use metrics::PoolView;

/// Status of a pool.
///
/// `Active` is the only status that accepts joins; every other status is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolStatus {
    /// Accepting joins.
    Active,
    /// Target reached.
    Success,
    /// Deadline passed before the target was reached.
    Failed,
    /// Closed early by the leader or an admin.
    Closed,
}

impl PoolStatus {
    /// Whether the status is terminal.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Stable upper-case label used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a pool status from string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid pool status: {value}")]
pub struct ParsePoolStatusError {
    value: String,
}

impl FromStr for PoolStatus {
    type Err = ParsePoolStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACTIVE" => Ok(Self::Active),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            "CLOSED" => Ok(Self::Closed),
            other => Err(ParsePoolStatusError {
                value: other.to_owned(),
            }),
        }
    }
}

/// Validation errors raised by [`Pool::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolValidationError {
    /// The target quantity was zero.
    #[error("pool target quantity must be positive")]
    ZeroTarget,
    /// A SUCCESS pool held less than its target.
    #[error("pool marked SUCCESS holds {current} of {target} units")]
    SuccessBelowTarget {
        /// Stored current quantity.
        current: u32,
        /// Stored target quantity.
        target: u32,
    },
    /// The deadline preceded the creation timestamp.
    #[error("pool deadline must not precede its creation time")]
    DeadlineBeforeCreation,
    /// The description was present but blank.
    #[error("pool description must not be blank")]
    BlankDescription,
}

/// Input payload for [`Pool::new`].
#[derive(Debug, Clone)]
pub struct PoolDraft {
    /// Pool identifier.
    pub id: PoolId,
    /// Product the pool buys.
    pub product_id: ProductId,
    /// Leader who opened the pool.
    pub leader_id: UserId,
    /// Quantity needed for the pool to succeed.
    pub target_quantity: u32,
    /// Quantity pledged so far.
    pub current_quantity: u32,
    /// Joins are refused strictly after this instant.
    pub deadline: DateTime<Utc>,
    /// Stored status.
    pub status: PoolStatus,
    /// Optional leader-supplied description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token owned by the repository.
    pub version: u64,
}

/// A persisted group-buy pool snapshot.
///
/// ## Invariants
/// - `target_quantity > 0`.
/// - `status == Success` implies `current_quantity >= target_quantity`.
/// - `id`, `product_id`, `leader_id`, `target_quantity`, `deadline`, and
///   `created_at` never change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub(super) id: PoolId,
    pub(super) product_id: ProductId,
    pub(super) leader_id: UserId,
    pub(super) target_quantity: u32,
    pub(super) current_quantity: u32,
    pub(super) deadline: DateTime<Utc>,
    pub(super) status: PoolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) description: Option<String>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) version: u64,
}

impl Pool {
    /// Creates a validated pool snapshot.
    pub fn new(draft: PoolDraft) -> Result<Self, PoolValidationError> {
        Self::try_from(draft)
    }

    /// Returns the pool id.
    pub const fn id(&self) -> PoolId {
        self.id
    }

    /// Returns the product reference.
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Returns the leader who opened the pool.
    pub const fn leader_id(&self) -> UserId {
        self.leader_id
    }

    /// Returns the target quantity.
    pub const fn target_quantity(&self) -> u32 {
        self.target_quantity
    }

    /// Returns the quantity pledged so far.
    pub const fn current_quantity(&self) -> u32 {
        self.current_quantity
    }

    /// Returns the deadline.
    pub const fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Returns the stored status, which may lag behind [`Pool::reconcile`].
    pub const fn status(&self) -> PoolStatus {
        self.status
    }

    /// Returns the optional description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creation timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the optimistic concurrency token.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns a copy carrying `version`.
    ///
    /// Repository adapters use this to stamp the version they stored; the
    /// join coordinator uses it to restore a previous snapshot over a newer
    /// one.
    #[must_use]
    pub fn with_version(&self, version: u64) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }
}

impl TryFrom<PoolDraft> for Pool {
    type Error = PoolValidationError;

    fn try_from(draft: PoolDraft) -> Result<Self, Self::Error> {
        if draft.target_quantity == 0 {
            return Err(PoolValidationError::ZeroTarget);
        }
        if draft.status == PoolStatus::Success && draft.current_quantity < draft.target_quantity {
            return Err(PoolValidationError::SuccessBelowTarget {
                current: draft.current_quantity,
                target: draft.target_quantity,
            });
        }
        if draft.deadline < draft.created_at {
            return Err(PoolValidationError::DeadlineBeforeCreation);
        }
        if draft
            .description
            .as_deref()
            .is_some_and(|text| text.trim().is_empty())
        {
            return Err(PoolValidationError::BlankDescription);
        }

        Ok(Self {
            id: draft.id,
            product_id: draft.product_id,
            leader_id: draft.leader_id,
            target_quantity: draft.target_quantity,
            current_quantity: draft.current_quantity,
            deadline: draft.deadline,
            status: draft.status,
            description: draft.description,
            created_at: draft.created_at,
            version: draft.version,
        })
    }
}
