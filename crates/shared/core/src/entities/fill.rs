use super::{OrderId, Side};
use crate::values::Timestamp;
use serde::{Deserialize, Serialize};

/// Incremental fill derived from an accepted order update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub side: Side,
    pub price: f64,
    /// Quantity filled by this update only, always > 0
    pub quantity: f64,
    pub timestamp: Timestamp,
}

impl Fill {
    /// Cash flow of the fill: negative for buys, positive for sells
    pub fn cash_flow(&self) -> f64 {
        -self.side.signed(self.price * self.quantity)
    }

    pub fn signed_quantity(&self) -> f64 {
        self.side.signed(self.quantity)
    }
}
