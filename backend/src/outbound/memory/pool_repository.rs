//! In-memory `PoolRepository` with optimistic version checks.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{PoolRepository, PoolRepositoryError};
use crate::domain::{Pool, PoolId, PoolStatus, UserId};

/// Pool store keyed by id.
///
/// `save` succeeds only while the stored version equals the incoming one,
/// then stores the pool with the version bumped by one. Listings are ordered
/// by creation time, then id.
#[derive(Debug, Default)]
pub struct InMemoryPoolRepository {
    pools: Mutex<HashMap<PoolId, Pool>>,
}

impl InMemoryPoolRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pools.
    pub fn len(&self) -> usize {
        self.lock_pools().len()
    }

    /// Whether no pool is stored.
    pub fn is_empty(&self) -> bool {
        self.lock_pools().is_empty()
    }

    fn lock_pools(&self) -> MutexGuard<'_, HashMap<PoolId, Pool>> {
        self.pools.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn collect_sorted(&self, keep: impl Fn(&Pool) -> bool) -> Vec<Pool> {
        let mut pools: Vec<Pool> = self
            .lock_pools()
            .values()
            .filter(|pool| keep(pool))
            .cloned()
            .collect();
        pools.sort_by_key(|pool| (pool.created_at(), pool.id().to_string()));
        pools
    }
}

#[async_trait]
impl PoolRepository for InMemoryPoolRepository {
    async fn load(&self, pool_id: &PoolId) -> Result<Option<Pool>, PoolRepositoryError> {
        Ok(self.lock_pools().get(pool_id).cloned())
    }

    async fn insert(&self, pool: &Pool) -> Result<Pool, PoolRepositoryError> {
        let mut pools = self.lock_pools();
        if pools.contains_key(&pool.id()) {
            return Err(PoolRepositoryError::duplicate(pool.id()));
        }
        pools.insert(pool.id(), pool.clone());
        Ok(pool.clone())
    }

    async fn save(&self, pool: &Pool) -> Result<Pool, PoolRepositoryError> {
        let mut pools = self.lock_pools();
        let stored = pools
            .get_mut(&pool.id())
            .ok_or_else(|| PoolRepositoryError::not_found(pool.id()))?;
        if stored.version() != pool.version() {
            return Err(PoolRepositoryError::conflict(pool.id(), pool.version()));
        }
        *stored = pool.with_version(pool.version() + 1);
        Ok(stored.clone())
    }

    async fn list_by_status(&self, status: PoolStatus) -> Result<Vec<Pool>, PoolRepositoryError> {
        Ok(self.collect_sorted(|pool| pool.status() == status))
    }

    async fn list_by_leader(&self, leader_id: &UserId) -> Result<Vec<Pool>, PoolRepositoryError> {
        Ok(self.collect_sorted(|pool| pool.leader_id() == *leader_id))
    }

    async fn list_all(&self) -> Result<Vec<Pool>, PoolRepositoryError> {
        Ok(self.collect_sorted(|_| true))
    }
}
