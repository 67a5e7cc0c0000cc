//! Rolling volatility of mid-price log returns

use std::collections::VecDeque;

/// Trading days per year used to annualize per-tick volatility
pub const ANNUALIZATION_DAYS: f64 = 252.0;

/// Fixed-size FIFO window of log returns between consecutive mid prices.
///
/// Volatility is the Bessel-corrected sample standard deviation of the window,
/// annualized by `sqrt(252)`. Fewer than two returns gives 0.
#[derive(Debug, Clone)]
pub struct VolatilityEstimator {
    window: usize,
    returns: VecDeque<f64>,
    last_price: Option<f64>,
}

impl VolatilityEstimator {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            returns: VecDeque::with_capacity(window),
            last_price: None,
        }
    }

    /// Feed the next mid price. Non-positive prices are ignored.
    pub fn update(&mut self, price: f64) {
        if !(price > 0.0 && price.is_finite()) {
            return;
        }
        if let Some(prev) = self.last_price {
            if self.returns.len() >= self.window {
                self.returns.pop_front();
            }
            self.returns.push_back((price / prev).ln());
        }
        self.last_price = Some(price);
    }

    /// Annualized volatility of the current window
    pub fn volatility(&self) -> f64 {
        let n = self.returns.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.returns.iter().sum::<f64>() / n as f64;
        let var = self
            .returns
            .iter()
            .map(|r| {
                let d = r - mean;
                d * d
            })
            .sum::<f64>()
            / (n - 1) as f64;
        var.sqrt() * ANNUALIZATION_DAYS.sqrt()
    }

    pub fn sample_count(&self) -> usize {
        self.returns.len()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
