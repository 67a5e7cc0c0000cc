use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// ```text
/// New ──► PartiallyFilled ──► ... ──► Filled
///  │             │
///  └─────────────┴──► Cancelled | Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Order has been registered but has no fills
    New,
    /// Order has been partially filled
    PartiallyFilled,
    /// Order has been completely filled
    Filled,
    /// Order was cancelled before completing
    Cancelled,
    /// Order was refused by a risk check or the exchange
    Rejected,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// Returns true if the order is still active
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }

    /// Whether moving from `self` to `next` respects the forward-only lifecycle.
    ///
    /// Staying in the same active state is allowed (e.g. a second partial fill).
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::New, _) => true,
            (OrderStatus::PartiallyFilled, OrderStatus::New) => false,
            (OrderStatus::PartiallyFilled, _) => true,
            (terminal, next) => *terminal == next,
        }
    }
}
