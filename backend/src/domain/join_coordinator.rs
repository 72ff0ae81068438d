//! Join coordinator: serialized, all-or-nothing joins.
//!
//! For one pool id the sequence reconcile, capacity check, increment, status
//! transition, pool save, and order record runs as one unit:
//!
//! - in-process, the pool's write lock from [`PoolLocks`] is held across the
//!   whole attempt;
//! - across processes, the repository's version check rejects stale saves,
//!   and the attempt is re-run from a fresh load (never just the increment).
//!
//! When the order sink fails after the pool save, the previous snapshot is
//! written back so no partial join survives. If another writer moved the pool
//! on in the meantime, the accepted quantity is withdrawn from the fresh
//! snapshot instead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{CatalogService, OrderSink, PoolRepository, PoolRepositoryError};
use crate::domain::reconciliation_sweep::persist_reconciled;
use crate::domain::write_retry::{AttemptError, classify_repository_error, retry_on_conflict};
use crate::domain::{
    LifecycleError, Order, OrderDraft, OrderId, Pool, PoolError, PoolId, PoolLocks, PoolStatus,
    UserId,
};

/// Retry policy for joins that lose a concurrent-write race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinCoordinatorConfig {
    max_attempts: u32,
}

impl JoinCoordinatorConfig {
    /// Attempts made when no configuration is supplied.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Upper bound accepted for `max_attempts`.
    pub const MAX_ATTEMPTS_CEILING: u32 = 10;

    /// Create a policy making `max_attempts` attempts, clamped to
    /// `1..=MAX_ATTEMPTS_CEILING`.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, Self::MAX_ATTEMPTS_CEILING),
        }
    }

    /// Attempts made before surfacing [`PoolError::Conflict`].
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for JoinCoordinatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Receipt of an accepted join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOutcome {
    /// Joined pool.
    pub pool_id: PoolId,
    /// Quantity added to the pool.
    pub accepted_quantity: u32,
    /// Catalog price read at join time.
    pub unit_price: Decimal,
    /// Pool status after the join.
    pub status: PoolStatus,
    /// Pool quantity after the join.
    pub current_quantity: u32,
    /// Slots left after the join.
    pub remaining_slots: u32,
    /// Order recorded for the join.
    pub order: Order,
}

/// Serializes joins per pool and commits each join atomically.
pub struct JoinCoordinator<R, C, O> {
    pool_repo: Arc<R>,
    catalog: Arc<C>,
    order_sink: Arc<O>,
    clock: Arc<dyn Clock>,
    locks: Arc<PoolLocks>,
    config: JoinCoordinatorConfig,
}

impl<R, C, O> Clone for JoinCoordinator<R, C, O> {
    fn clone(&self) -> Self {
        Self {
            pool_repo: Arc::clone(&self.pool_repo),
            catalog: Arc::clone(&self.catalog),
            order_sink: Arc::clone(&self.order_sink),
            clock: Arc::clone(&self.clock),
            locks: Arc::clone(&self.locks),
            config: self.config,
        }
    }
}

impl<R, C, O> JoinCoordinator<R, C, O> {
    /// Create a coordinator with the default retry policy.
    ///
    /// `locks` must be the registry shared with every other writer of the
    /// same pools.
    pub fn new(
        pool_repo: Arc<R>,
        catalog: Arc<C>,
        order_sink: Arc<O>,
        clock: Arc<dyn Clock>,
        locks: Arc<PoolLocks>,
    ) -> Self {
        Self {
            pool_repo,
            catalog,
            order_sink,
            clock,
            locks,
            config: JoinCoordinatorConfig::default(),
        }
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_config(mut self, config: JoinCoordinatorConfig) -> Self {
        self.config = config;
        self
    }
}

impl<R, C, O> JoinCoordinator<R, C, O>
where
    R: PoolRepository,
    C: CatalogService,
    O: OrderSink,
{
    /// Pledge `quantity` units of `pool_id` on behalf of `member_id`.
    ///
    /// Either the pool save and the order record both commit, or neither
    /// does. Conflicting writes are retried from a fresh load up to the
    /// configured number of attempts, then surface as
    /// [`PoolError::Conflict`].
    pub async fn join(
        &self,
        pool_id: PoolId,
        member_id: UserId,
        quantity: i64,
    ) -> Result<JoinOutcome, PoolError> {
        if quantity <= 0 {
            return Err(PoolError::from_lifecycle(
                pool_id,
                LifecycleError::InvalidQuantity { quantity },
            ));
        }

        let _guard = self.locks.acquire(pool_id).await;
        let result = retry_on_conflict(pool_id, "join", self.config, move || {
            self.attempt_join(pool_id, member_id, quantity)
        })
        .await;
        match &result {
            Ok(outcome) => info!(
                pool_id = %pool_id,
                member_id = %member_id,
                quantity = outcome.accepted_quantity,
                status = %outcome.status,
                "join accepted"
            ),
            Err(error) => {
                debug!(pool_id = %pool_id, member_id = %member_id, %error, "join rejected");
            }
        }
        result
    }

    async fn attempt_join(
        &self,
        pool_id: PoolId,
        member_id: UserId,
        quantity: i64,
    ) -> Result<JoinOutcome, AttemptError> {
        let pool = self
            .pool_repo
            .load(&pool_id)
            .await
            .map_err(|error| classify_repository_error(pool_id, error))?
            .ok_or(PoolError::PoolNotFound { pool_id })?;
        let now = self.clock.utc();

        let acceptance = match pool.join(now, quantity) {
            Ok(acceptance) => acceptance,
            Err(rejection @ LifecycleError::PoolClosed { .. }) => {
                persist_reconciled(self.pool_repo.as_ref(), &pool, now)
                    .await
                    .map_err(|error| classify_repository_error(pool_id, error))?;
                return Err(PoolError::from_lifecycle(pool_id, rejection).into());
            }
            Err(rejection) => return Err(PoolError::from_lifecycle(pool_id, rejection).into()),
        };

        let unit_price = self.unit_price(&pool).await?;
        let order = Order::place(OrderDraft {
            id: OrderId::random(),
            user_id: member_id,
            pool_id,
            quantity: acceptance.accepted_quantity,
            unit_price,
            created_at: now,
        })
        .map_err(|error| {
            PoolError::storage_unavailable(format!("catalog price rejected: {error}"))
        })?;

        let saved = self
            .pool_repo
            .save(&acceptance.pool)
            .await
            .map_err(|error| classify_repository_error(pool_id, error))?;

        if let Err(sink_error) = self.order_sink.record(&order).await {
            self.restore(&pool, &saved, acceptance.accepted_quantity, now).await?;
            return Err(PoolError::storage_unavailable(format!(
                "order not recorded, join rolled back: {sink_error}"
            ))
            .into());
        }

        Ok(JoinOutcome {
            pool_id,
            accepted_quantity: acceptance.accepted_quantity,
            unit_price,
            status: saved.status(),
            current_quantity: saved.current_quantity(),
            remaining_slots: saved.remaining_slots(),
            order,
        })
    }

    async fn unit_price(&self, pool: &Pool) -> Result<Decimal, PoolError> {
        let product_id = pool.product_id();
        self.catalog
            .price_of(&product_id)
            .await
            .map_err(|error| PoolError::storage_unavailable(error.to_string()))?
            .ok_or(PoolError::ProductNotFound { product_id })
    }

    /// Undo a committed pool save whose order could not be recorded.
    ///
    /// The first write puts `previous` back over `saved`. When that loses a
    /// version race, `accepted_quantity` is withdrawn from a fresh load and
    /// the save is retried within the attempt budget.
    async fn restore(
        &self,
        previous: &Pool,
        saved: &Pool,
        accepted_quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<(), PoolError> {
        let pool_id = previous.id();
        let max_attempts = self.config.max_attempts();
        let mut rollback = previous.with_version(saved.version());
        for attempt in 1..=max_attempts {
            match self.pool_repo.save(&rollback).await {
                Ok(_) => {
                    warn!(pool_id = %pool_id, attempt, "order sink failed; pool save rolled back");
                    return Ok(());
                }
                Err(PoolRepositoryError::Conflict { .. }) => {
                    debug!(
                        pool_id = %pool_id,
                        attempt,
                        "rollback lost a concurrent write; reloading"
                    );
                    match self.pool_repo.load(&pool_id).await {
                        Ok(Some(current)) => {
                            rollback = current.withdrawn(accepted_quantity, now);
                        }
                        Ok(None) => {
                            warn!(pool_id = %pool_id, "pool deleted before rollback");
                            return Ok(());
                        }
                        Err(load_error) => return Err(rollback_failed(pool_id, &load_error)),
                    }
                }
                Err(save_error) => return Err(rollback_failed(pool_id, &save_error)),
            }
        }

        Err(rollback_failed(
            pool_id,
            &PoolRepositoryError::conflict(pool_id, rollback.version()),
        ))
    }
}

fn rollback_failed(pool_id: PoolId, cause: &PoolRepositoryError) -> PoolError {
    error!(pool_id = %pool_id, error = %cause, "order sink failed and pool rollback failed");
    PoolError::storage_unavailable(format!(
        "order not recorded and pool rollback failed: {cause}"
    ))
}

#[cfg(test)]
#[path = "join_coordinator_tests.rs"]
mod tests;
