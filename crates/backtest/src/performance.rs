//! Return statistics for a finished replay

use kestrel_core::Side;
use kestrel_risk_manager::adverse_selection;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Sharpe of strategy returns in excess of the mid benchmark
    pub information_ratio: f64,
    pub max_drawdown: f64,
    /// Positive returns over non-zero returns
    pub win_rate: f64,
    pub profit_factor: f64,
    /// Annualized standard deviation of returns
    pub volatility: f64,
    pub avg_adverse_selection: f64,
    /// Mean distance from mid earned per trade, in price units
    pub avg_spread_capture: f64,
    pub trades_per_bar: f64,
}

/// Accumulates per-trade microstructure figures during the replay and turns
/// the equity and benchmark return series into [`PerformanceMetrics`].
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    periods_per_year: f64,
    adverse_selection_sum: f64,
    spread_capture_sum: f64,
    trades: usize,
}

impl PerformanceMonitor {
    pub fn new(periods_per_year: f64) -> Self {
        Self {
            periods_per_year,
            adverse_selection_sum: 0.0,
            spread_capture_sum: 0.0,
            trades: 0,
        }
    }

    pub fn record_trade(&mut self, side: Side, price: f64, mid: f64) {
        if mid <= 0.0 {
            return;
        }
        self.adverse_selection_sum += adverse_selection(side, price, mid);
        self.spread_capture_sum += match side {
            Side::Buy => mid - price,
            Side::Sell => price - mid,
        };
        self.trades += 1;
    }

    pub fn calculate(
        &self,
        initial_capital: f64,
        final_equity: f64,
        returns: &[f64],
        benchmark_returns: &[f64],
        max_drawdown: f64,
        bars: usize,
    ) -> PerformanceMetrics {
        let annualize = self.periods_per_year.sqrt();
        let active: Vec<f64> = returns
            .iter()
            .zip(benchmark_returns)
            .map(|(r, b)| r - b)
            .collect();

        let (gains, losses) = returns.iter().fold((0.0, 0.0), |(g, l), &r| {
            if r > 0.0 { (g + r, l) } else { (g, l - r) }
        });
        let profit_factor = if losses > 0.0 {
            gains / losses
        } else if gains > 0.0 {
            f64::MAX
        } else {
            0.0
        };

        let positive = returns.iter().filter(|r| **r > 0.0).count();
        let nonzero = returns.iter().filter(|r| **r != 0.0).count();

        let per_trade = |sum: f64| {
            if self.trades == 0 {
                0.0
            } else {
                sum / self.trades as f64
            }
        };

        PerformanceMetrics {
            total_return: if initial_capital > 0.0 {
                final_equity / initial_capital - 1.0
            } else {
                0.0
            },
            sharpe_ratio: ratio(returns) * annualize,
            information_ratio: ratio(&active) * annualize,
            max_drawdown,
            win_rate: if nonzero == 0 {
                0.0
            } else {
                positive as f64 / nonzero as f64
            },
            profit_factor,
            volatility: std_dev(returns) * annualize,
            avg_adverse_selection: per_trade(self.adverse_selection_sum),
            avg_spread_capture: per_trade(self.spread_capture_sum),
            trades_per_bar: if bars == 0 {
                0.0
            } else {
                self.trades as f64 / bars as f64
            },
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation; zero below two observations
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Mean over standard deviation, zero when the series does not move
fn ratio(values: &[f64]) -> f64 {
    let sd = std_dev(values);
    if sd > 0.0 { mean(values) / sd } else { 0.0 }
}

/// Log returns between consecutive positive values
pub fn log_returns(series: &[f64]) -> Vec<f64> {
    series
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                0.0
            }
        })
        .collect()
}
