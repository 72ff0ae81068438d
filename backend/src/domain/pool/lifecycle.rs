//! Pool status machine.
//!
//! ```text
//! ACTIVE --(current >= target)------------------> SUCCESS
//! ACTIVE --(now > deadline, current < target)---> FAILED
//! ACTIVE --(close by leader or admin)-----------> CLOSED
//! ```
//!
//! SUCCESS, FAILED, and CLOSED are terminal. Every operation here is pure:
//! it reads a snapshot plus the current time and returns a new snapshot or a
//! rejection, leaving persistence to the caller.

use chrono::{DateTime, Utc};

use super::{Pool, PoolStatus};

/// Rejections raised by the status machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The join quantity was zero or negative.
    #[error("join quantity must be a positive integer (got {quantity})")]
    InvalidQuantity {
        /// Quantity supplied by the caller.
        quantity: i64,
    },
    /// The reconciled status no longer accepts mutations.
    #[error("pool is not accepting changes (status {status})")]
    PoolClosed {
        /// Reconciled status at evaluation time.
        status: PoolStatus,
    },
    /// The join asked for more than the remaining capacity.
    #[error("requested {requested} units but only {remaining} remain")]
    InsufficientSlots {
        /// Quantity supplied by the caller.
        requested: i64,
        /// Remaining slots at evaluation time.
        remaining: u32,
    },
}

/// Result of an accepted join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAcceptance {
    /// Updated pool snapshot, not yet persisted.
    pub pool: Pool,
    /// Quantity added by the join.
    pub accepted_quantity: u32,
}

impl Pool {
    /// Derives the status this pool should have at `now`.
    ///
    /// Rules apply in fixed order: a terminal status never changes; a pool at
    /// or over target is SUCCESS; a pool past its deadline is FAILED;
    /// otherwise it stays ACTIVE. Applying the result and reconciling again
    /// yields the same status.
    pub fn reconcile(&self, now: DateTime<Utc>) -> PoolStatus {
        if self.status.is_terminal() {
            self.status
        } else if self.current_quantity >= self.target_quantity {
            PoolStatus::Success
        } else if self.is_expired(now) {
            PoolStatus::Failed
        } else {
            PoolStatus::Active
        }
    }

    /// Returns a copy whose stored status matches [`Pool::reconcile`].
    #[must_use]
    pub fn reconciled(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: self.reconcile(now),
            ..self.clone()
        }
    }

    /// Applies a member's pledge of `quantity` units.
    ///
    /// The pool is reconciled before capacity is checked, so an expired pool
    /// refuses the join even when slots remain. An accepted join that reaches
    /// the target moves the pool straight to SUCCESS.
    pub fn join(&self, now: DateTime<Utc>, quantity: i64) -> Result<JoinAcceptance, LifecycleError> {
        if quantity <= 0 {
            return Err(LifecycleError::InvalidQuantity { quantity });
        }

        let status = self.reconcile(now);
        if status != PoolStatus::Active {
            return Err(LifecycleError::PoolClosed { status });
        }

        let remaining = self.remaining_slots();
        let accepted_quantity = u32::try_from(quantity)
            .ok()
            .filter(|requested| *requested <= remaining)
            .ok_or(LifecycleError::InsufficientSlots {
                requested: quantity,
                remaining,
            })?;

        let current_quantity = self.current_quantity.saturating_add(accepted_quantity);
        let status = if current_quantity >= self.target_quantity {
            PoolStatus::Success
        } else {
            PoolStatus::Active
        };

        Ok(JoinAcceptance {
            pool: Self {
                current_quantity,
                status,
                ..self.clone()
            },
            accepted_quantity,
        })
    }

    /// Removes `quantity` units pledged by a join that could not be recorded.
    ///
    /// Used to compensate a join against a snapshot that other writers have
    /// moved on since. A SUCCESS that no longer meets the target drops back to
    /// whatever the pool reconciles to at `now`; CLOSED and FAILED are kept.
    #[must_use]
    pub fn withdrawn(&self, quantity: u32, now: DateTime<Utc>) -> Self {
        let current_quantity = self.current_quantity.saturating_sub(quantity);
        let status = if self.status == PoolStatus::Success && current_quantity < self.target_quantity
        {
            PoolStatus::Active
        } else {
            self.status
        };

        Self {
            current_quantity,
            status,
            ..self.clone()
        }
        .reconciled(now)
    }

    /// Closes an active pool early.
    ///
    /// A pool whose reconciled status is already terminal cannot be closed.
    pub fn close(&self, now: DateTime<Utc>) -> Result<Self, LifecycleError> {
        let status = self.reconcile(now);
        if status != PoolStatus::Active {
            return Err(LifecycleError::PoolClosed { status });
        }

        Ok(Self {
            status: PoolStatus::Closed,
            ..self.clone()
        })
    }
}
