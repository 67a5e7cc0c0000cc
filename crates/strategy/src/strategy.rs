//! Strategy Trait
//!
//! Defines the interface between quoting logic and whatever drives it:
//! the live session or the backtest engine.

use kestrel_core::{MarketDepth, Order, OrderId};

/// Actions a strategy hands to the execution layer
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A newly registered order to route to the venue
    Submit(Order),
    /// Cancel an order previously submitted
    Cancel(OrderId),
}

/// Strategy trait - implement this for your quoting strategy
///
/// Strategies place and cancel through the order manager themselves; the
/// returned actions tell the caller what must reach the venue.
pub trait Strategy: Send {
    /// Strategy name for logging
    fn name(&self) -> &str;

    /// Called for every book snapshot, in timestamp order
    fn on_market_data(&mut self, depth: &MarketDepth) -> Vec<Action>;

    /// Current signed inventory
    fn position(&self) -> f64;

    /// Called on shutdown to cleanup (optional)
    fn on_shutdown(&mut self) -> Vec<Action> {
        Vec::new()
    }
}
