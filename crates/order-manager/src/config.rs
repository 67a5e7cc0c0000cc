use serde::{Deserialize, Serialize};

/// Local limits enforced by the order manager before an order is registered.
///
/// These are advisory pre-checks; the risk manager applies its own global
/// checks on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderManagerConfig {
    pub symbol: String,
    /// Max absolute position after the order fills
    pub max_position: f64,
    /// Max quantity of a single order
    pub max_order_size: f64,
    /// Max cumulative traded notional
    pub max_notional: f64,
    /// Max number of simultaneously active orders
    pub max_active_orders: usize,
    /// Smallest quoted spread the venue accepts (informational)
    pub min_spread: f64,
}

impl Default for OrderManagerConfig {
    fn default() -> Self {
        Self {
            symbol: "XBTUSD".to_string(),
            max_position: 100.0,
            max_order_size: 10.0,
            max_notional: 10_000.0,
            max_active_orders: 50,
            min_spread: 0.0001,
        }
    }
}
