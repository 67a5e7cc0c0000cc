//! Order book and order flow statistics over a replayed session
//!
//! Everything here is a pure function of the snapshots and the simulated
//! trades; nothing feeds back into the replay.

use crate::results::TradeRecord;
use kestrel_core::{MarketDepth, Side};
use serde::{Deserialize, Serialize};

/// Trades per VPIN volume bucket
pub const VPIN_BUCKET_SIZE: usize = 50;

/// Depth used for the weighted mid in the price impact regression
const IMPACT_LEVELS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookAnalytics {
    pub spread_mean: f64,
    pub spread_std: f64,
    pub mean_imbalance: f64,
    /// Average share of each side's volume sitting at the touch
    pub volume_concentration: f64,
    pub vpin: f64,
    pub kyle_lambda: f64,
}

pub fn analyze(snapshots: &[MarketDepth], trades: &[TradeRecord]) -> BookAnalytics {
    let spreads: Vec<f64> = snapshots.iter().filter_map(|d| d.spread()).collect();
    let (spread_mean, spread_std) = population_moments(&spreads);

    let n = snapshots.len().max(1) as f64;
    let mean_imbalance = snapshots.iter().map(|d| d.imbalance(IMPACT_LEVELS)).sum::<f64>() / n;
    let volume_concentration = snapshots
        .iter()
        .map(|d| {
            0.5 * (concentration(d.bids[0].quantity, d.total_bid_liquidity())
                + concentration(d.asks[0].quantity, d.total_ask_liquidity()))
        })
        .sum::<f64>()
        / n;

    BookAnalytics {
        spread_mean,
        spread_std,
        mean_imbalance,
        volume_concentration,
        vpin: vpin(trades),
        kyle_lambda: kyle_lambda(snapshots, trades),
    }
}

fn population_moments(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn concentration(top: f64, total: f64) -> f64 {
    if total > 0.0 { top / total } else { 0.0 }
}

/// Mean |buy − sell| / total volume over full buckets of
/// [`VPIN_BUCKET_SIZE`] trades. Zero with fewer trades than one bucket.
pub fn vpin(trades: &[TradeRecord]) -> f64 {
    let imbalances: Vec<f64> = trades
        .chunks_exact(VPIN_BUCKET_SIZE)
        .filter_map(|bucket| {
            let (buy, sell) = bucket.iter().fold((0.0, 0.0), |(b, s), t| match t.side {
                Side::Buy => (b + t.quantity, s),
                Side::Sell => (b, s + t.quantity),
            });
            let total = buy + sell;
            (total > 0.0).then(|| (buy - sell).abs() / total)
        })
        .collect();

    if imbalances.is_empty() {
        0.0
    } else {
        imbalances.iter().sum::<f64>() / imbalances.len() as f64
    }
}

/// Slope of the weighted-mid change on signed traded volume per bar,
/// regressed through the origin. Bars without trades are left out.
pub fn kyle_lambda(snapshots: &[MarketDepth], trades: &[TradeRecord]) -> f64 {
    let (mut sum_xy, mut sum_xx) = (0.0, 0.0);
    let mut next_trade = 0;

    for pair in snapshots.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        let mut signed_volume = 0.0;
        while next_trade < trades.len() && trades[next_trade].timestamp <= curr.last_update {
            let t = &trades[next_trade];
            if t.timestamp > prev.last_update {
                signed_volume += t.side.signed(t.quantity);
            }
            next_trade += 1;
        }
        if signed_volume == 0.0 {
            continue;
        }
        let (Some(p0), Some(p1)) = (
            prev.weighted_mid(IMPACT_LEVELS),
            curr.weighted_mid(IMPACT_LEVELS),
        ) else {
            continue;
        };
        sum_xy += (p1 - p0) * signed_volume;
        sum_xx += signed_volume * signed_volume;
    }

    if sum_xx > 0.0 { sum_xy / sum_xx } else { 0.0 }
}
