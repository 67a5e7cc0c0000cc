//! Live risk aggregates
//!
//! [`MetricsState`] is the mutable state behind the risk manager's mutex.
//! [`RiskTelemetry`] mirrors its scalars into atomics so monitoring can read
//! them without contending with the update path.

use crate::breaker::BreakerState;
use kestrel_core::AtomicF64;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// State mutated as a unit by `update_metrics`
#[derive(Debug, Default)]
pub(crate) struct MetricsState {
    pub daily_pnl: f64,
    pub max_drawdown: f64,
    pub position: f64,
    pub position_value: f64,
    pub var: f64,
    pub prices: VecDeque<f64>,
    pub adverse_selection_sum: f64,
    pub fills: u64,
}

impl MetricsState {
    pub fn push_price(&mut self, price: f64, capacity: usize) {
        if self.prices.len() >= capacity.max(2) {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn avg_adverse_selection(&self) -> f64 {
        if self.fills == 0 {
            0.0
        } else {
            self.adverse_selection_sum / self.fills as f64
        }
    }
}

/// Lock-free copies of the latest aggregates
#[derive(Debug, Default)]
pub(crate) struct RiskTelemetry {
    pub var: AtomicF64,
    pub daily_pnl: AtomicF64,
    pub max_drawdown: AtomicF64,
    pub position: AtomicF64,
    pub position_value: AtomicF64,
    pub adverse_selection: AtomicF64,
    pub message_count: AtomicU64,
}

impl RiskTelemetry {
    pub fn publish(&self, state: &MetricsState) {
        self.var.store(state.var, Ordering::Release);
        self.daily_pnl.store(state.daily_pnl, Ordering::Release);
        self.max_drawdown.store(state.max_drawdown, Ordering::Release);
        self.position.store(state.position, Ordering::Release);
        self.position_value
            .store(state.position_value, Ordering::Release);
        self.adverse_selection
            .store(state.avg_adverse_selection(), Ordering::Release);
    }
}

/// Point-in-time view of the risk aggregates for monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub var: f64,
    pub daily_pnl: f64,
    pub max_drawdown: f64,
    pub position: f64,
    pub position_value: f64,
    /// Mean adverse selection over fills
    pub adverse_selection: f64,
    pub message_count: u64,
    pub breaker: BreakerState,
}

/// Signed relative price paid through the mid: positive when the order paid
/// through the touch.
pub fn adverse_selection(side: kestrel_core::Side, price: f64, mid: f64) -> f64 {
    match side {
        kestrel_core::Side::Buy => (price - mid) / mid,
        kestrel_core::Side::Sell => (mid - price) / mid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::Side;

    #[test]
    fn test_adverse_selection_sign() {
        assert!((adverse_selection(Side::Buy, 101.0, 100.0) - 0.01).abs() < 1e-12);
        assert!((adverse_selection(Side::Sell, 101.0, 100.0) + 0.01).abs() < 1e-12);
        assert!(adverse_selection(Side::Buy, 99.0, 100.0) < 0.0);
    }

    #[test]
    fn test_price_history_is_bounded() {
        let mut state = MetricsState::default();
        for i in 0..10 {
            state.push_price(i as f64, 4);
        }
        assert_eq!(state.prices.len(), 4);
        assert_eq!(state.prices.front(), Some(&6.0));
    }
}
