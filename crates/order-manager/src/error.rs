//! Order Manager errors
//!
//! Two families live here. [`PlacementRejection`] is an ordinary outcome of a
//! local limit check. [`UpdateError`] is a protocol violation: an execution
//! update that can't be applied to the order table.

use kestrel_core::{OrderId, OrderStatus};
use thiserror::Error;

/// Why `place_order` declined to register an order
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementRejection {
    #[error("invalid order: price={price}, quantity={quantity}")]
    InvalidOrder { price: f64, quantity: f64 },

    #[error("order size {quantity} exceeds max_order_size {limit}")]
    OrderSize { quantity: f64, limit: f64 },

    #[error("resulting position {resulting} exceeds max_position {limit}")]
    Position { resulting: f64, limit: f64 },

    #[error("resulting notional {resulting} exceeds max_notional {limit}")]
    Notional { resulting: f64, limit: f64 },

    #[error("{active} active orders, max_active_orders is {limit}")]
    ActiveOrders { active: usize, limit: usize },
}

/// Execution update that violates the order lifecycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpdateError {
    #[error("unknown order {0}")]
    UnknownOrder(OrderId),

    #[error("order {id} is already {status:?}")]
    TerminalOrder { id: OrderId, status: OrderStatus },

    #[error("negative fill delta on order {id}: filled {previous} -> {reported}")]
    NegativeFill {
        id: OrderId,
        previous: f64,
        reported: f64,
    },

    #[error("order {id} overfilled: filled {filled} > quantity {quantity}")]
    Overfill {
        id: OrderId,
        filled: f64,
        quantity: f64,
    },

    #[error("order {id} status regressed from {from:?} to {to:?}")]
    StatusRegression {
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    },
}

pub type Result<T> = std::result::Result<T, UpdateError>;
