//! Request-time reconciliation of active pools.
//!
//! Pools are not advanced by a timer. Before active pools are listed to a
//! caller, the sweep re-derives each one's status and persists those whose
//! deadline passed or whose target was reached. Quantities are never touched.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::{PoolRepository, PoolRepositoryError};
use crate::domain::{Pool, PoolError, PoolId, PoolLocks, PoolStatus};

/// Persist the reconciled status of `pool` when it differs from the stored
/// one. Returns the stored snapshot, or `None` when nothing changed.
///
/// Callers must hold the pool's write lock.
pub(crate) async fn persist_reconciled<R>(
    repo: &R,
    pool: &Pool,
    now: DateTime<Utc>,
) -> Result<Option<Pool>, PoolRepositoryError>
where
    R: PoolRepository + ?Sized,
{
    let status = pool.reconcile(now);
    if status == pool.status() {
        return Ok(None);
    }

    let saved = repo.save(&pool.reconciled(now)).await?;
    info!(
        pool_id = %pool.id(),
        from = %pool.status(),
        to = %status,
        current_quantity = pool.current_quantity(),
        "pool status reconciled"
    );
    Ok(Some(saved))
}

/// Counts produced by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Active pools listed by the repository.
    pub examined: usize,
    /// Pools moved to SUCCESS.
    pub succeeded: usize,
    /// Pools moved to FAILED.
    pub failed: usize,
    /// Pools that vanished or changed concurrently and were left alone.
    pub skipped: usize,
}

impl SweepReport {
    /// Number of pools whose status was persisted.
    pub const fn transitioned(&self) -> usize {
        self.succeeded + self.failed
    }

    fn record(&mut self, status: PoolStatus) {
        match status {
            PoolStatus::Success => self.succeeded += 1,
            PoolStatus::Failed => self.failed += 1,
            PoolStatus::Active | PoolStatus::Closed => {}
        }
    }
}

/// Batch reconcile over every pool the repository reports as ACTIVE.
pub struct ReconciliationSweep<R> {
    pool_repo: Arc<R>,
    clock: Arc<dyn Clock>,
    locks: Arc<PoolLocks>,
}

impl<R> Clone for ReconciliationSweep<R> {
    fn clone(&self) -> Self {
        Self {
            pool_repo: Arc::clone(&self.pool_repo),
            clock: Arc::clone(&self.clock),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<R> ReconciliationSweep<R> {
    /// Create a sweep sharing `locks` with the other pool writers.
    pub fn new(pool_repo: Arc<R>, clock: Arc<dyn Clock>, locks: Arc<PoolLocks>) -> Self {
        Self {
            pool_repo,
            clock,
            locks,
        }
    }
}

enum PoolSweepOutcome {
    Unchanged,
    Transitioned(PoolStatus),
    Skipped,
}

impl<R> ReconciliationSweep<R>
where
    R: PoolRepository,
{
    /// Reconcile every active pool against the clock.
    ///
    /// Storage failures abort the sweep; a pool that disappears or is
    /// written concurrently is skipped, since its next reader reconciles it
    /// again.
    pub async fn sweep(&self) -> Result<SweepReport, PoolError> {
        let now = self.clock.utc();
        let active = self
            .pool_repo
            .list_by_status(PoolStatus::Active)
            .await
            .map_err(|error| {
                PoolError::storage_unavailable(format!("listing active pools: {error}"))
            })?;

        let mut report = SweepReport::default();
        for pool in active {
            report.examined += 1;
            if pool.reconcile(now) == pool.status() {
                continue;
            }
            match self.reconcile_pool(pool.id(), now).await? {
                PoolSweepOutcome::Transitioned(status) => report.record(status),
                PoolSweepOutcome::Skipped => report.skipped += 1,
                PoolSweepOutcome::Unchanged => {}
            }
        }

        debug!(
            examined = report.examined,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "reconciliation sweep finished"
        );
        Ok(report)
    }

    async fn reconcile_pool(
        &self,
        pool_id: PoolId,
        now: DateTime<Utc>,
    ) -> Result<PoolSweepOutcome, PoolError> {
        let _guard = self.locks.acquire(pool_id).await;

        let fresh = match self.pool_repo.load(&pool_id).await {
            Ok(Some(pool)) => pool,
            Ok(None) => {
                warn!(pool_id = %pool_id, "pool vanished during sweep");
                return Ok(PoolSweepOutcome::Skipped);
            }
            Err(error) => return Err(PoolError::from_repository(pool_id, error)),
        };

        match persist_reconciled(self.pool_repo.as_ref(), &fresh, now).await {
            Ok(Some(saved)) => Ok(PoolSweepOutcome::Transitioned(saved.status())),
            Ok(None) => Ok(PoolSweepOutcome::Unchanged),
            Err(
                error @ (PoolRepositoryError::Conflict { .. }
                | PoolRepositoryError::NotFound { .. }),
            ) => {
                warn!(pool_id = %pool_id, %error, "skipping pool during sweep");
                Ok(PoolSweepOutcome::Skipped)
            }
            Err(error) => Err(PoolError::from_repository(pool_id, error)),
        }
    }
}
