//! Read-side pool views.
//!
//! Views reconcile lazily: the returned status reflects the clock, but
//! nothing is written except by [`PoolQueryService::list_active`], which
//! sweeps before listing.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{PoolRepository, PoolRepositoryError};
use crate::domain::reconciliation_sweep::ReconciliationSweep;
use crate::domain::{Pool, PoolError, PoolId, PoolLocks, PoolStatus, PoolView, UserId};

fn listing_failed(error: PoolRepositoryError) -> PoolError {
    PoolError::storage_unavailable(format!("listing pools: {error}"))
}

/// Pool detail and listings.
pub struct PoolQueryService<R> {
    pool_repo: Arc<R>,
    clock: Arc<dyn Clock>,
    sweep: ReconciliationSweep<R>,
}

impl<R> Clone for PoolQueryService<R> {
    fn clone(&self) -> Self {
        Self {
            pool_repo: Arc::clone(&self.pool_repo),
            clock: Arc::clone(&self.clock),
            sweep: self.sweep.clone(),
        }
    }
}

impl<R> PoolQueryService<R> {
    /// Create a query service; `locks` guards the writes of its sweep.
    pub fn new(pool_repo: Arc<R>, clock: Arc<dyn Clock>, locks: Arc<PoolLocks>) -> Self {
        let sweep = ReconciliationSweep::new(Arc::clone(&pool_repo), Arc::clone(&clock), locks);
        Self {
            pool_repo,
            clock,
            sweep,
        }
    }

    fn views(&self, pools: Vec<Pool>) -> Vec<PoolView> {
        let now = self.clock.utc();
        pools.iter().map(|pool| PoolView::at(pool, now)).collect()
    }
}

impl<R> PoolQueryService<R>
where
    R: PoolRepository,
{
    /// Detail view of one pool.
    pub async fn get_pool(&self, pool_id: PoolId) -> Result<PoolView, PoolError> {
        let pool = self
            .pool_repo
            .load(&pool_id)
            .await
            .map_err(|error| PoolError::from_repository(pool_id, error))?
            .ok_or(PoolError::PoolNotFound { pool_id })?;
        Ok(PoolView::at(&pool, self.clock.utc()))
    }

    /// Pools still open for joins, after persisting any due transitions.
    pub async fn list_active(&self) -> Result<Vec<PoolView>, PoolError> {
        self.sweep.sweep().await?;
        let pools = self
            .pool_repo
            .list_by_status(PoolStatus::Active)
            .await
            .map_err(listing_failed)?;
        let mut views = self.views(pools);
        views.retain(|view| view.is_active);
        Ok(views)
    }

    /// Pools opened by `leader_id`.
    pub async fn list_by_leader(&self, leader_id: UserId) -> Result<Vec<PoolView>, PoolError> {
        let pools = self
            .pool_repo
            .list_by_leader(&leader_id)
            .await
            .map_err(listing_failed)?;
        Ok(self.views(pools))
    }

    /// Every pool.
    pub async fn list_all(&self) -> Result<Vec<PoolView>, PoolError> {
        let pools = self.pool_repo.list_all().await.map_err(listing_failed)?;
        Ok(self.views(pools))
    }
}
