//! Errors surfaced by pool services.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses, CLI exit codes, or any other protocol-specific envelope via
//! [`PoolError::code`].

use serde::{Deserialize, Serialize};

use crate::domain::pool::LifecycleError;
use crate::domain::ports::PoolRepositoryError;
use crate::domain::{PoolId, PoolStatus, ProductId};

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum PoolErrorCode {
    /// Quantity was zero or negative.
    InvalidQuantity,
    /// Pool no longer accepts changes.
    PoolClosed,
    /// Quantity exceeds the remaining capacity.
    InsufficientSlots,
    /// Pool id does not resolve.
    PoolNotFound,
    /// Product id does not resolve in the catalog.
    ProductNotFound,
    /// Concurrent writes kept winning until retries ran out.
    Conflict,
    /// Persistence or a collaborator failed.
    StorageUnavailable,
    /// Caller lacks the capability for the operation.
    Forbidden,
    /// Request to open a pool failed validation.
    InvalidPool,
}

/// Error returned by the join coordinator and the other pool services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Quantity was zero or negative.
    #[error("join quantity must be a positive integer (got {quantity})")]
    InvalidQuantity {
        /// Quantity supplied by the caller.
        quantity: i64,
    },
    /// The reconciled status is terminal.
    #[error("pool {pool_id} is not accepting changes (status {status})")]
    PoolClosed {
        /// Affected pool.
        pool_id: PoolId,
        /// Reconciled status.
        status: PoolStatus,
    },
    /// Quantity exceeds the remaining capacity.
    #[error("pool {pool_id} has {remaining} slots left but {requested} were requested")]
    InsufficientSlots {
        /// Affected pool.
        pool_id: PoolId,
        /// Quantity supplied by the caller.
        requested: i64,
        /// Remaining slots when the join was evaluated.
        remaining: u32,
    },
    /// Pool id does not resolve, or the pool vanished mid-operation.
    #[error("pool {pool_id} not found")]
    PoolNotFound {
        /// Missing pool.
        pool_id: PoolId,
    },
    /// Product id does not resolve in the catalog.
    #[error("product {product_id} not found")]
    ProductNotFound {
        /// Missing product.
        product_id: ProductId,
    },
    /// Concurrent writes kept winning until retries ran out.
    #[error("pool {pool_id} kept changing concurrently; gave up after {attempts} attempts")]
    Conflict {
        /// Contended pool.
        pool_id: PoolId,
        /// Attempts made.
        attempts: u32,
    },
    /// Persistence or a collaborator failed; nothing was committed.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        /// Adapter-supplied detail.
        message: String,
    },
    /// Caller lacks the capability for the operation.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Reason for the refusal.
        message: String,
    },
    /// Request to open a pool failed validation.
    #[error("invalid pool: {message}")]
    InvalidPool {
        /// Validation failure.
        message: String,
    },
}

/// Join-specific name for [`PoolError`].
pub type JoinError = PoolError;

/// Join-specific name for [`PoolErrorCode`].
pub type JoinErrorCode = PoolErrorCode;

impl PoolError {
    /// Stable machine-readable error code.
    pub const fn code(&self) -> PoolErrorCode {
        match self {
            Self::InvalidQuantity { .. } => PoolErrorCode::InvalidQuantity,
            Self::PoolClosed { .. } => PoolErrorCode::PoolClosed,
            Self::InsufficientSlots { .. } => PoolErrorCode::InsufficientSlots,
            Self::PoolNotFound { .. } => PoolErrorCode::PoolNotFound,
            Self::ProductNotFound { .. } => PoolErrorCode::ProductNotFound,
            Self::Conflict { .. } => PoolErrorCode::Conflict,
            Self::StorageUnavailable { .. } => PoolErrorCode::StorageUnavailable,
            Self::Forbidden { .. } => PoolErrorCode::Forbidden,
            Self::InvalidPool { .. } => PoolErrorCode::InvalidPool,
        }
    }

    /// Convenience constructor for [`PoolError::StorageUnavailable`].
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`PoolError::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Convenience constructor for [`PoolError::InvalidPool`].
    pub fn invalid_pool(message: impl Into<String>) -> Self {
        Self::InvalidPool {
            message: message.into(),
        }
    }

    /// Attaches `pool_id` to a pure lifecycle rejection.
    pub const fn from_lifecycle(pool_id: PoolId, error: LifecycleError) -> Self {
        match error {
            LifecycleError::InvalidQuantity { quantity } => Self::InvalidQuantity { quantity },
            LifecycleError::PoolClosed { status } => Self::PoolClosed { pool_id, status },
            LifecycleError::InsufficientSlots {
                requested,
                remaining,
            } => Self::InsufficientSlots {
                pool_id,
                requested,
                remaining,
            },
        }
    }

    /// Maps a repository failure observed while writing `pool_id`.
    ///
    /// Callers that retry conflicts intercept [`PoolRepositoryError::Conflict`]
    /// first; reaching this mapping with one means a single attempt was made.
    pub fn from_repository(pool_id: PoolId, error: PoolRepositoryError) -> Self {
        match error {
            PoolRepositoryError::NotFound { pool_id: missing } => {
                Self::PoolNotFound { pool_id: missing }
            }
            PoolRepositoryError::Conflict {
                pool_id: contended, ..
            } => Self::Conflict {
                pool_id: contended,
                attempts: 1,
            },
            PoolRepositoryError::Duplicate { .. } => {
                Self::invalid_pool(format!("pool {pool_id} already exists"))
            }
            PoolRepositoryError::Connection { message } | PoolRepositoryError::Query { message } => {
                Self::storage_unavailable(format!("pool repository: {message}"))
            }
        }
    }
}
