use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OrderStatus, Side};
use crate::values::Symbol;

/// Order identifier assigned by the order manager.
///
/// Ids are allocated from a monotonically increasing counter and never reused.
pub type OrderId = u64;

/// Full order details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub filled_quantity: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new limit order with explicit timestamp
    pub fn new_with_time(
        id: OrderId,
        symbol: impl Into<Symbol>,
        side: Side,
        price: f64,
        quantity: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            price,
            quantity,
            filled_quantity: 0.0,
            status: OrderStatus::New,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns remaining quantity to be filled
    pub fn remaining_quantity(&self) -> f64 {
        (self.quantity - self.filled_quantity).max(0.0)
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Order value at the limit price
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Snapshot of this order after its cumulative fill reaches `filled_quantity`.
    ///
    /// This is what an execution report looks like once applied to a known
    /// order; the status follows the fill level.
    pub fn with_fill(&self, filled_quantity: f64, timestamp: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.filled_quantity = filled_quantity;
        next.status = if filled_quantity >= self.quantity {
            OrderStatus::Filled
        } else if filled_quantity > 0.0 {
            OrderStatus::PartiallyFilled
        } else {
            self.status
        };
        next.updated_at = timestamp;
        next
    }

    /// Snapshot of this order in a different status, fills unchanged
    pub fn with_status(&self, status: OrderStatus, timestamp: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.status = status;
        next.updated_at = timestamp;
        next
    }
}
