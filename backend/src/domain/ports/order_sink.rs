//! Port receiving the order created by an accepted join.

use async_trait::async_trait;

use crate::domain::Order;

use super::define_port_error;

define_port_error! {
    /// Errors raised by order sink adapters.
    pub enum OrderSinkError {
        /// The order could not be stored.
        Unavailable { message: String } =>
            "order sink unavailable: {message}",
    }
}

/// Records orders. Invoked once per accepted join, after the pool save.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderSink: Send + Sync {
    /// Persist `order`.
    async fn record(&self, order: &Order) -> Result<(), OrderSinkError>;
}

/// Fixture sink for tests that do not inspect orders.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardingOrderSink;

#[async_trait]
impl OrderSink for DiscardingOrderSink {
    async fn record(&self, _order: &Order) -> Result<(), OrderSinkError> {
        Ok(())
    }
}
