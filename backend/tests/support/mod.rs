//! Shared harness for the integration suites.
//!
//! Wires every service to the same in-memory adapters, lock registry, and a
//! clock the test can move.

#![allow(dead_code, reason = "each suite uses a different subset")]

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use groupbuy::domain::{
    CallerIdentity, JoinCoordinator, OpenPoolRequest, Pool, PoolAdminService, PoolId, PoolLocks,
    PoolQueryService, ProductId, ReconciliationSweep, Role, UserId, require_pool_opener,
};
use groupbuy::domain::ports::PoolRepository;
use groupbuy::outbound::memory::{InMemoryCatalog, InMemoryOrderSink, InMemoryPoolRepository};
use groupbuy::test_support::{MutableClock, fixture_now};
use mockable::Clock;
use rust_decimal::Decimal;

pub type Coordinator = JoinCoordinator<InMemoryPoolRepository, InMemoryCatalog, InMemoryOrderSink>;

/// Services sharing one set of adapters.
pub struct Marketplace {
    pub repo: Arc<InMemoryPoolRepository>,
    pub catalog: Arc<InMemoryCatalog>,
    pub sink: Arc<InMemoryOrderSink>,
    pub clock: Arc<MutableClock>,
    pub locks: Arc<PoolLocks>,
    pub leader: UserId,
}

impl Marketplace {
    pub fn new() -> Self {
        Self {
            repo: Arc::new(InMemoryPoolRepository::new()),
            catalog: Arc::new(InMemoryCatalog::new()),
            sink: Arc::new(InMemoryOrderSink::new()),
            clock: Arc::new(MutableClock::new(fixture_now())),
            locks: Arc::new(PoolLocks::new()),
            leader: UserId::random(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    fn dyn_clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn coordinator(&self) -> Coordinator {
        JoinCoordinator::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.catalog),
            Arc::clone(&self.sink),
            self.dyn_clock(),
            Arc::clone(&self.locks),
        )
    }

    pub fn admin(&self) -> PoolAdminService<InMemoryPoolRepository, InMemoryCatalog> {
        PoolAdminService::new(
            Arc::clone(&self.repo),
            Arc::clone(&self.catalog),
            self.dyn_clock(),
            Arc::clone(&self.locks),
        )
    }

    pub fn query(&self) -> PoolQueryService<InMemoryPoolRepository> {
        PoolQueryService::new(Arc::clone(&self.repo), self.dyn_clock(), Arc::clone(&self.locks))
    }

    pub fn sweep(&self) -> ReconciliationSweep<InMemoryPoolRepository> {
        ReconciliationSweep::new(Arc::clone(&self.repo), self.dyn_clock(), Arc::clone(&self.locks))
    }

    /// Open an ACTIVE pool for a freshly priced product.
    pub async fn open_pool(&self, target: u32, lifetime: TimeDelta) -> Pool {
        let product_id = ProductId::random();
        self.catalog.set_price(product_id, Decimal::new(1999, 2));
        let opener = require_pool_opener(&CallerIdentity::new(self.leader, Role::Leader))
            .expect("leaders may open pools");
        self.admin()
            .open_pool(
                &opener,
                OpenPoolRequest {
                    product_id,
                    target_quantity: target,
                    deadline: self.now() + lifetime,
                    description: None,
                },
            )
            .await
            .expect("pool opens")
    }

    /// Open a pool and pledge `current` units up front.
    pub async fn open_pool_with(&self, target: u32, current: u32, lifetime: TimeDelta) -> Pool {
        let pool = self.open_pool(target, lifetime).await;
        if current > 0 {
            self.coordinator()
                .join(pool.id(), UserId::random(), i64::from(current))
                .await
                .expect("seed join accepted");
        }
        load_pool(&self.repo, pool.id()).await
    }
}

/// Load a pool the test knows exists.
pub async fn load_pool(repo: &InMemoryPoolRepository, pool_id: PoolId) -> Pool {
    repo.load(&pool_id)
        .await
        .expect("load succeeds")
        .expect("pool exists")
}
