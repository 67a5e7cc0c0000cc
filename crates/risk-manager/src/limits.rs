//! Risk limits
//!
//! Static configuration for the risk manager, constructed once per session.

use serde::{Deserialize, Serialize};

/// Global per-order and portfolio limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Max `price * quantity` of a single order
    pub max_order_value: f64,
    /// Max sustained order messages per second over the session window
    pub max_message_rate_per_second: f64,
    /// Max relative price paid through the mid (0.01 = 1%)
    pub max_adverse_selection: f64,
    /// Confidence level for historical VaR
    pub var_confidence: f64,
    /// Max stressed loss `|position_value| * VaR * multiplier`
    pub var_limit: f64,
    /// Multiplier applied to VaR in the stress test
    pub stress_test_multiplier: f64,
    /// Mid prices retained for VaR (FIFO)
    pub price_history_capacity: usize,
    /// Circuit breaker thresholds
    pub breaker: BreakerConfig,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_order_value: 100_000.0,
            max_message_rate_per_second: 100.0,
            max_adverse_selection: 0.01,
            var_confidence: 0.99,
            var_limit: 100_000.0,
            stress_test_multiplier: 3.0,
            price_history_capacity: 1000,
            breaker: BreakerConfig::default(),
        }
    }
}

/// Circuit breaker thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Trip when daily P&L falls below `-loss_threshold`
    pub loss_threshold: f64,
    /// Trip when the largest single negative P&L exceeds this
    pub max_drawdown: f64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            loss_threshold: 50_000.0,
            max_drawdown: 100_000.0,
        }
    }
}
