//! Opening and closing pools.
//!
//! Callers pass capabilities from [`crate::domain::auth`] rather than raw
//! identities, so role checks stay in front of these operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Deserialize;
use tracing::info;

use crate::domain::auth::{PoolCloser, PoolOpener};
use crate::domain::join_coordinator::JoinCoordinatorConfig;
use crate::domain::ports::{CatalogService, PoolRepository};
use crate::domain::reconciliation_sweep::persist_reconciled;
use crate::domain::write_retry::{AttemptError, classify_repository_error, retry_on_conflict};
use crate::domain::{
    LifecycleError, Pool, PoolDraft, PoolError, PoolId, PoolLocks, PoolStatus, ProductId,
};

/// Parameters for a new pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenPoolRequest {
    /// Product bought by the pool.
    pub product_id: ProductId,
    /// Units needed for the pool to succeed.
    pub target_quantity: u32,
    /// Instant after which the pool fails unless it reached its target.
    pub deadline: DateTime<Utc>,
    /// Optional free text shown to members.
    #[serde(default)]
    pub description: Option<String>,
}

/// Leader and admin operations on pools.
pub struct PoolAdminService<R, C> {
    pool_repo: Arc<R>,
    catalog: Arc<C>,
    clock: Arc<dyn Clock>,
    locks: Arc<PoolLocks>,
    retry: JoinCoordinatorConfig,
}

impl<R, C> Clone for PoolAdminService<R, C> {
    fn clone(&self) -> Self {
        Self {
            pool_repo: Arc::clone(&self.pool_repo),
            catalog: Arc::clone(&self.catalog),
            clock: Arc::clone(&self.clock),
            locks: Arc::clone(&self.locks),
            retry: self.retry,
        }
    }
}

impl<R, C> PoolAdminService<R, C> {
    /// Create a service sharing `locks` with the other pool writers.
    pub fn new(
        pool_repo: Arc<R>,
        catalog: Arc<C>,
        clock: Arc<dyn Clock>,
        locks: Arc<PoolLocks>,
    ) -> Self {
        Self {
            pool_repo,
            catalog,
            clock,
            locks,
            retry: JoinCoordinatorConfig::default(),
        }
    }

    /// Use the join retry policy for closes as well.
    #[must_use]
    pub fn with_retry(mut self, retry: JoinCoordinatorConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl<R, C> PoolAdminService<R, C>
where
    R: PoolRepository,
    C: CatalogService,
{
    /// Open an ACTIVE pool led by `opener`.
    pub async fn open_pool(
        &self,
        opener: &PoolOpener,
        request: OpenPoolRequest,
    ) -> Result<Pool, PoolError> {
        let now = self.clock.utc();
        if request.target_quantity == 0 {
            return Err(PoolError::invalid_pool("target quantity must be positive"));
        }
        if request.deadline <= now {
            return Err(PoolError::invalid_pool("deadline must be in the future"));
        }

        let product_id = request.product_id;
        self.catalog
            .price_of(&product_id)
            .await
            .map_err(|error| PoolError::storage_unavailable(error.to_string()))?
            .ok_or(PoolError::ProductNotFound { product_id })?;

        let pool = Pool::new(PoolDraft {
            id: PoolId::random(),
            product_id,
            leader_id: opener.leader_id(),
            target_quantity: request.target_quantity,
            current_quantity: 0,
            deadline: request.deadline,
            status: PoolStatus::Active,
            description: request.description,
            created_at: now,
            version: 0,
        })
        .map_err(|error| PoolError::invalid_pool(error.to_string()))?;

        let stored = self
            .pool_repo
            .insert(&pool)
            .await
            .map_err(|error| PoolError::from_repository(pool.id(), error))?;
        info!(
            pool_id = %stored.id(),
            leader_id = %stored.leader_id(),
            target = stored.target_quantity(),
            "pool opened"
        );
        Ok(stored)
    }

    /// Close an ACTIVE pool before its deadline.
    ///
    /// A pool whose reconciled status is already terminal is rejected with
    /// [`PoolError::PoolClosed`], and that status is persisted.
    pub async fn close_pool(
        &self,
        closer: &PoolCloser,
        pool_id: PoolId,
    ) -> Result<Pool, PoolError> {
        let _guard = self.locks.acquire(pool_id).await;
        let closed = retry_on_conflict(pool_id, "close", self.retry, move || {
            self.attempt_close(closer, pool_id)
        })
        .await?;
        info!(pool_id = %pool_id, closed_by = %closer.user_id(), "pool closed");
        Ok(closed)
    }

    async fn attempt_close(
        &self,
        closer: &PoolCloser,
        pool_id: PoolId,
    ) -> Result<Pool, AttemptError> {
        let pool = self
            .pool_repo
            .load(&pool_id)
            .await
            .map_err(|error| classify_repository_error(pool_id, error))?
            .ok_or(PoolError::PoolNotFound { pool_id })?;
        if !closer.permits(&pool) {
            return Err(PoolError::forbidden(format!(
                "user {} does not lead pool {pool_id}",
                closer.user_id()
            ))
            .into());
        }

        let now = self.clock.utc();
        let closed = match pool.close(now) {
            Ok(closed) => closed,
            Err(rejection @ LifecycleError::PoolClosed { .. }) => {
                persist_reconciled(self.pool_repo.as_ref(), &pool, now)
                    .await
                    .map_err(|error| classify_repository_error(pool_id, error))?;
                return Err(PoolError::from_lifecycle(pool_id, rejection).into());
            }
            Err(rejection) => return Err(PoolError::from_lifecycle(pool_id, rejection).into()),
        };

        self.pool_repo
            .save(&closed)
            .await
            .map_err(|error| classify_repository_error(pool_id, error))
    }
}
