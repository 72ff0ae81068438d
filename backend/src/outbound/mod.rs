//! Outbound adapters implementing domain ports.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of the domain port traits:
//!
//! - **memory**: process-local pool, catalog, and order stores used by the
//!   demo binary and the integration tests
//!
//! Adapters are thin translators that convert between domain types and
//! storage representations. They contain no business logic.

pub mod memory;
