//! Test utilities for the groupbuy crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled for tests or with the
//! `test-support` feature.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::{Pool, PoolDraft, PoolId, PoolStatus, ProductId, UserId};

/// Fixed instant most tests treat as "now".
pub fn fixture_now() -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).single() {
        Some(now) => now,
        None => panic!("fixture timestamp must be unambiguous"),
    }
}

/// Clock frozen at [`fixture_now`].
pub fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(MutableClock::new(fixture_now()))
}

/// Clock that tests can move forward.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Create a clock reading `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Draft of an ACTIVE pool created three days before [`fixture_now`].
pub fn pool_draft(target: u32, current: u32, deadline: DateTime<Utc>) -> PoolDraft {
    PoolDraft {
        id: PoolId::random(),
        product_id: ProductId::random(),
        leader_id: UserId::random(),
        target_quantity: target,
        current_quantity: current,
        deadline,
        status: PoolStatus::Active,
        description: None,
        created_at: fixture_now() - TimeDelta::days(3),
        version: 0,
    }
}

/// ACTIVE pool built from [`pool_draft`].
///
/// # Panics
///
/// Panics when the arguments violate pool invariants.
pub fn pool_with(target: u32, current: u32, deadline: DateTime<Utc>) -> Pool {
    match Pool::new(pool_draft(target, current, deadline)) {
        Ok(pool) => pool,
        Err(error) => panic!("fixture pool must be valid: {error}"),
    }
}
