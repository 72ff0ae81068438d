//! Port for pool persistence.
//!
//! Saves are guarded by an optimistic version check: an adapter stores a
//! pool only when the stored version still equals [`Pool::version`], then
//! bumps the version and returns the stored snapshot. Adapters backed by a
//! transactional store may implement the check with a conditional update.

use async_trait::async_trait;

use crate::domain::{Pool, PoolId, PoolStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by pool repository adapters.
    pub enum PoolRepositoryError {
        /// Repository connection could not be established or timed out.
        Connection { message: String } =>
            "pool repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "pool repository query failed: {message}",
        /// The stored version moved on since the pool was loaded.
        Conflict { pool_id: PoolId, expected_version: u64 } =>
            "pool {pool_id} changed concurrently (expected version {expected_version})",
        /// The pool was deleted between load and save.
        NotFound { pool_id: PoolId } =>
            "pool {pool_id} no longer exists",
        /// Insert collided with an existing pool id.
        Duplicate { pool_id: PoolId } =>
            "pool {pool_id} already exists",
    }
}

/// Port for loading, saving, and listing pools.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PoolRepository: Send + Sync {
    /// Find a pool by id.
    async fn load(&self, pool_id: &PoolId) -> Result<Option<Pool>, PoolRepositoryError>;

    /// Store a brand new pool and return the stored snapshot.
    async fn insert(&self, pool: &Pool) -> Result<Pool, PoolRepositoryError>;

    /// Store an updated pool if its version is still current.
    ///
    /// Returns the stored snapshot carrying the bumped version. Fails with
    /// [`PoolRepositoryError::Conflict`] when another writer got there first
    /// and [`PoolRepositoryError::NotFound`] when the pool was deleted.
    async fn save(&self, pool: &Pool) -> Result<Pool, PoolRepositoryError>;

    /// List pools whose stored status equals `status`.
    async fn list_by_status(&self, status: PoolStatus) -> Result<Vec<Pool>, PoolRepositoryError>;

    /// List pools opened by `leader_id`.
    async fn list_by_leader(&self, leader_id: &UserId) -> Result<Vec<Pool>, PoolRepositoryError>;

    /// List every pool.
    async fn list_all(&self) -> Result<Vec<Pool>, PoolRepositoryError>;
}
