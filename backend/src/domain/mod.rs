//! Domain primitives, aggregates, and services.
//!
//! Purpose: Model group-buy pools and the join flow that fills them. Keep
//! entities immutable and state their invariants in each type's Rustdoc.
//! Storage, the product catalog, and order persistence sit behind the traits
//! in [`ports`].
//!
//! Public surface:
//! - Pool (alias to `pool::Pool`) — pool snapshot with lifecycle and metrics.
//! - JoinCoordinator (alias to `join_coordinator::JoinCoordinator`) —
//!   serialized, all-or-nothing joins.
//! - PoolAdminService / PoolQueryService — opening, closing, and listing.
//! - PoolError (alias to `error::PoolError`) — failure taxonomy with stable
//!   codes.

pub mod auth;
pub mod error;
pub mod ids;
pub mod join_coordinator;
pub mod order;
pub mod pool;
pub mod pool_admin_service;
pub mod pool_locks;
pub mod pool_query_service;
pub mod ports;
pub mod reconciliation_sweep;
mod write_retry;

pub use self::auth::{
    CallerIdentity, PoolCloser, PoolOpener, Role, require_pool_closer, require_pool_opener,
};
pub use self::error::{JoinError, JoinErrorCode, PoolError, PoolErrorCode};
pub use self::ids::{IdValidationError, OrderId, PoolId, ProductId, UserId};
pub use self::join_coordinator::{JoinCoordinator, JoinCoordinatorConfig, JoinOutcome};
pub use self::order::{Order, OrderDraft, OrderValidationError, PaymentStatus};
pub use self::pool::{
    JoinAcceptance, LifecycleError, ParsePoolStatusError, Pool, PoolDraft, PoolStatus,
    PoolValidationError, PoolView,
};
pub use self::pool_admin_service::{OpenPoolRequest, PoolAdminService};
pub use self::pool_locks::{PoolLocks, PoolWriteGuard};
pub use self::pool_query_service::PoolQueryService;
pub use self::reconciliation_sweep::{ReconciliationSweep, SweepReport};
