//! Historical value-at-risk

/// Log returns of consecutive prices. Non-positive prices are skipped.
pub fn log_returns<'a>(prices: impl IntoIterator<Item = &'a f64>) -> Vec<f64> {
    let mut returns = Vec::new();
    let mut prev: Option<f64> = None;
    for &price in prices {
        if price <= 0.0 {
            continue;
        }
        if let Some(p) = prev {
            returns.push((price / p).ln());
        }
        prev = Some(price);
    }
    returns
}

/// Historical VaR: the return at rank `floor((1 - confidence) * n)` of the
/// ascending sample, negated so that losses are positive.
///
/// Returns 0 for an empty sample.
pub fn historical_var(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((1.0 - confidence) * sorted.len() as f64).floor().max(0.0) as usize;
    -sorted[rank.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_rank_for_hundred_returns() {
        // -0.050, -0.049, ..., 0.049 shuffled by reversing
        let returns: Vec<f64> = (0..100).rev().map(|i| (i as f64 - 50.0) / 1000.0).collect();
        let var = historical_var(&returns, 0.99);
        // floor(0.01 * 100) = 1 -> second smallest, -0.049
        assert!((var - 0.049).abs() < 1e-12);
    }

    #[test]
    fn test_var_empty_and_single() {
        assert_eq!(historical_var(&[], 0.99), 0.0);
        assert_eq!(historical_var(&[-0.02], 0.99), 0.02);
    }

    #[test]
    fn test_var_rank_clamped() {
        // confidence 0 would index past the end
        assert_eq!(historical_var(&[0.01, 0.02], 0.0), -0.02);
    }

    #[test]
    fn test_log_returns() {
        let prices = [100.0, 110.0, 0.0, 99.0];
        let r = log_returns(&prices);
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1f64).ln()).abs() < 1e-12);
        assert!((r[1] - (0.9f64).ln()).abs() < 1e-12);
    }
}
