//! Process-local adapters backed by `std::sync::Mutex`.
//!
//! Locks are held only for map operations and never across an `.await`.

mod catalog;
mod order_sink;
mod pool_repository;

pub use catalog::InMemoryCatalog;
pub use order_sink::InMemoryOrderSink;
pub use pool_repository::InMemoryPoolRepository;
