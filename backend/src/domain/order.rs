//! Orders created by accepted joins.
//!
//! An order is the receipt of one accepted join: the pledged quantity and the
//! unit price read from the catalog at join time. Orders never change
//! quantity after creation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{OrderId, PoolId, UserId};

/// Payment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Awaiting payment; every new order starts here.
    Pending,
    /// Paid.
    Paid,
    /// Cancelled before payment.
    Cancelled,
}

/// Validation errors raised by [`Order::place`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderValidationError {
    /// The order quantity was zero.
    #[error("order quantity must be positive")]
    ZeroQuantity,
    /// The catalog returned a negative unit price.
    #[error("order unit price must not be negative (got {unit_price})")]
    NegativePrice {
        /// Offending unit price.
        unit_price: Decimal,
    },
    /// `quantity * unit_price` does not fit a decimal.
    #[error("order total overflows for {quantity} x {unit_price}")]
    TotalOverflow {
        /// Order quantity.
        quantity: u32,
        /// Unit price.
        unit_price: Decimal,
    },
}

/// Input payload for [`Order::place`].
#[derive(Debug, Clone)]
pub struct OrderDraft {
    /// Order identifier.
    pub id: OrderId,
    /// Member who joined.
    pub user_id: UserId,
    /// Pool the member joined.
    pub pool_id: PoolId,
    /// Accepted quantity.
    pub quantity: u32,
    /// Unit price read from the catalog at join time.
    pub unit_price: Decimal,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Order recorded for an accepted join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    pool_id: PoolId,
    quantity: u32,
    unit_price: Decimal,
    total_price: Decimal,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Places a pending order, computing `total_price = quantity * unit_price`.
    pub fn place(draft: OrderDraft) -> Result<Self, OrderValidationError> {
        if draft.quantity == 0 {
            return Err(OrderValidationError::ZeroQuantity);
        }
        if draft.unit_price.is_sign_negative() && !draft.unit_price.is_zero() {
            return Err(OrderValidationError::NegativePrice {
                unit_price: draft.unit_price,
            });
        }
        let total_price = draft
            .unit_price
            .checked_mul(Decimal::from(draft.quantity))
            .ok_or(OrderValidationError::TotalOverflow {
                quantity: draft.quantity,
                unit_price: draft.unit_price,
            })?;

        Ok(Self {
            id: draft.id,
            user_id: draft.user_id,
            pool_id: draft.pool_id,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total_price,
            payment_status: PaymentStatus::Pending,
            created_at: draft.created_at,
        })
    }

    /// Returns the order id.
    pub const fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the member who placed the order.
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the pool the order belongs to.
    pub const fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Returns the ordered quantity.
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Returns the unit price snapshot.
    pub const fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Returns the total price.
    pub const fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Returns the payment status.
    pub const fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    /// Returns the creation timestamp.
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
