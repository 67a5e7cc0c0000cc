//! Backtest configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub include_transaction_costs: bool,
    pub transaction_cost_bps: f64,
    pub include_slippage: bool,
    pub slippage_bps: f64,
    /// Snapshots fed to the strategy before trading is simulated
    pub warm_up_bars: usize,
    /// End the replay on the bar the circuit breaker trips
    pub stop_on_halt: bool,
    /// Annualization factor for return statistics
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 1_000_000.0,
            include_transaction_costs: true,
            transaction_cost_bps: 0.5,
            include_slippage: true,
            slippage_bps: 1.0,
            warm_up_bars: 100,
            stop_on_halt: false,
            periods_per_year: 252.0,
        }
    }
}

impl BacktestConfig {
    /// Same settings with costs and slippage switched off
    pub fn frictionless(mut self) -> Self {
        self.include_transaction_costs = false;
        self.include_slippage = false;
        self
    }
}
