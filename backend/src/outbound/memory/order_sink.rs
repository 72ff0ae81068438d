//! In-memory `OrderSink`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::ports::{OrderSink, OrderSinkError};
use crate::domain::{Order, PoolId};

/// Append-only order log.
///
/// [`InMemoryOrderSink::fail_next_records`] makes every following `record`
/// fail until it is switched off, which exercises join rollback.
#[derive(Debug, Default)]
pub struct InMemoryOrderSink {
    orders: Mutex<Vec<Order>>,
    failing: AtomicBool,
}

impl InMemoryOrderSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded orders in arrival order.
    pub fn orders(&self) -> Vec<Order> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded orders for `pool_id`.
    pub fn orders_for(&self, pool_id: PoolId) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|order| order.pool_id() == pool_id)
            .collect()
    }

    /// Toggle failure of subsequent records.
    pub fn fail_next_records(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OrderSink for InMemoryOrderSink {
    async fn record(&self, order: &Order) -> Result<(), OrderSinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(OrderSinkError::unavailable(format!(
                "order {} rejected by sink",
                order.id()
            )));
        }
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::{OrderDraft, OrderId, UserId};
    use crate::test_support::fixture_now;

    fn order(pool_id: PoolId) -> Order {
        Order::place(OrderDraft {
            id: OrderId::random(),
            user_id: UserId::random(),
            pool_id,
            quantity: 2,
            unit_price: Decimal::new(300, 2),
            created_at: fixture_now(),
        })
        .expect("valid order")
    }

    #[rstest]
    #[tokio::test]
    async fn records_orders_until_failing() {
        let sink = InMemoryOrderSink::new();
        let pool_id = PoolId::random();

        sink.record(&order(pool_id)).await.expect("recorded");
        sink.record(&order(PoolId::random())).await.expect("recorded");
        sink.fail_next_records(true);
        let error = sink.record(&order(pool_id)).await.expect_err("sink failing");

        assert!(error.to_string().contains("rejected by sink"));
        assert_eq!(sink.orders().len(), 2);
        assert_eq!(sink.orders_for(pool_id).len(), 1);
    }
}
