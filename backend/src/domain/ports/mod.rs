//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Persistence, the product catalog, and order storage are external
//! collaborators. Each trait exposes strongly typed errors so adapters map
//! their failures into predictable variants.

mod macros;
pub(crate) use macros::define_port_error;

mod catalog_service;
mod order_sink;
mod pool_repository;

#[cfg(test)]
pub use catalog_service::MockCatalogService;
pub use catalog_service::{CatalogService, CatalogServiceError, FixedPriceCatalog};
#[cfg(test)]
pub use order_sink::MockOrderSink;
pub use order_sink::{DiscardingOrderSink, OrderSink, OrderSinkError};
#[cfg(test)]
pub use pool_repository::MockPoolRepository;
pub use pool_repository::{PoolRepository, PoolRepositoryError};
