//! Read-only pool projections recomputed on demand.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Pool, PoolStatus};

const FULL_PERCENT: u64 = 100;

impl Pool {
    /// Slots left before the target is reached, floored at zero.
    pub const fn remaining_slots(&self) -> u32 {
        self.target_quantity.saturating_sub(self.current_quantity)
    }

    /// Pledged share of the target as a whole percentage in `0..=100`.
    ///
    /// Rounds half away from zero and clamps overshoot to 100. A zero target
    /// reports 0.
    pub fn progress_percentage(&self) -> u8 {
        let target = u64::from(self.target_quantity);
        let scaled = u64::from(self.current_quantity) * FULL_PERCENT * 2 + target;
        let percent = scaled
            .checked_div(target * 2)
            .unwrap_or(0)
            .min(FULL_PERCENT);
        u8::try_from(percent).unwrap_or(u8::MAX)
    }

    /// Whether `now` is strictly past the deadline.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }

    /// Whether the pool is stored as ACTIVE and has not expired.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == PoolStatus::Active && !self.is_expired(now)
    }
}

/// Read model of a pool as seen at a point in time.
///
/// The embedded snapshot carries the reconciled status; the metrics are
/// derived from it and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolView {
    /// Reconciled pool snapshot.
    pub pool: Pool,
    /// Pledged share of the target in `0..=100`.
    pub progress_percentage: u8,
    /// Slots left before the target.
    pub remaining_slots: u32,
    /// Whether the deadline has passed.
    pub is_expired: bool,
    /// Whether the pool still accepts joins.
    pub is_active: bool,
}

impl PoolView {
    /// Builds the view of `pool` at `now`, applying reconcile lazily.
    pub fn at(pool: &Pool, now: DateTime<Utc>) -> Self {
        let pool = pool.reconciled(now);
        Self {
            progress_percentage: pool.progress_percentage(),
            remaining_slots: pool.remaining_slots(),
            is_expired: pool.is_expired(now),
            is_active: pool.is_active(now),
            pool,
        }
    }
}
