//! Synthetic snapshot series for tests and demos
//!
//! Every series uses one-second bars from a fixed epoch and a symmetric
//! book of [`LEVELS`] levels around the mid.

use chrono::{DateTime, Duration, TimeZone, Utc};
use kestrel_core::MarketDepth;
use rand::prelude::*;
use rand_distr::Normal;

pub const LEVELS: usize = 5;
const HALF_SPREAD: f64 = 0.05;
const LEVEL_STEP: f64 = 0.05;
const LEVEL_SIZE: f64 = 10.0;

fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0)
        .single()
        .unwrap_or_default()
}

/// Symmetric book around `mid`
pub fn book_around(symbol: &str, mid: f64, timestamp: DateTime<Utc>) -> MarketDepth {
    let bids: Vec<(f64, f64)> = (0..LEVELS)
        .map(|i| (mid - HALF_SPREAD - i as f64 * LEVEL_STEP, LEVEL_SIZE))
        .collect();
    let asks: Vec<(f64, f64)> = (0..LEVELS)
        .map(|i| (mid + HALF_SPREAD + i as f64 * LEVEL_STEP, LEVEL_SIZE))
        .collect();
    MarketDepth::from_levels(symbol, &bids, &asks, timestamp)
}

/// One snapshot per mid, one second apart
pub fn from_mids(symbol: &str, mids: &[f64]) -> Vec<MarketDepth> {
    let start = epoch();
    mids.iter()
        .enumerate()
        .map(|(i, mid)| book_around(symbol, *mid, start + Duration::seconds(i as i64)))
        .collect()
}

pub fn flat_series(symbol: &str, mid: f64, bars: usize) -> Vec<MarketDepth> {
    from_mids(symbol, &vec![mid; bars])
}

/// Mid moves by `step` per bar
pub fn linear_series(symbol: &str, start: f64, step: f64, bars: usize) -> Vec<MarketDepth> {
    let mids: Vec<f64> = (0..bars).map(|i| start + step * i as f64).collect();
    from_mids(symbol, &mids)
}

/// Geometric Brownian motion path with per-bar `drift` and `volatility`
pub fn simulate_price_path(start: f64, drift: f64, volatility: f64, bars: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut path = Vec::with_capacity(bars);
    let Ok(normal) = Normal::new(0.0, volatility.max(0.0)) else {
        return vec![start; bars];
    };
    let mut price = start;
    for _ in 0..bars {
        path.push(price);
        let shock: f64 = normal.sample(&mut rng);
        price *= (drift - 0.5 * volatility * volatility + shock).exp();
    }
    path
}

pub fn gbm_series(
    symbol: &str,
    start: f64,
    drift: f64,
    volatility: f64,
    bars: usize,
    seed: u64,
) -> Vec<MarketDepth> {
    from_mids(symbol, &simulate_price_path(start, drift, volatility, bars, seed))
}
