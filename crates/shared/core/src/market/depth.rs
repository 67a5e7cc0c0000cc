use serde::{Deserialize, Serialize};

use crate::values::Timestamp;

/// Number of price levels carried per side
pub const MAX_LEVELS: usize = 20;

/// A single price level. A non-positive price means "no quote present".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: f64,
    pub quantity: f64,
    /// Exchange update time of this level in nanoseconds
    pub update_time: i64,
}

impl DepthLevel {
    pub fn new(price: f64, quantity: f64, update_time: i64) -> Self {
        Self {
            price,
            quantity,
            update_time,
        }
    }

    pub fn is_quoted(&self) -> bool {
        self.price > 0.0
    }
}

/// Fixed-capacity order book snapshot.
///
/// Level 0 is the best level on each side: highest bid, lowest ask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepth {
    pub symbol: String,
    pub bids: [DepthLevel; MAX_LEVELS],
    pub asks: [DepthLevel; MAX_LEVELS],
    pub last_update: Timestamp,
}

impl MarketDepth {
    /// Empty book for `symbol`
    pub fn new(symbol: impl Into<String>, last_update: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            bids: [DepthLevel::default(); MAX_LEVELS],
            asks: [DepthLevel::default(); MAX_LEVELS],
            last_update,
        }
    }

    /// Build a book from `(price, quantity)` pairs, best level first.
    ///
    /// Levels past [`MAX_LEVELS`] are ignored.
    pub fn from_levels(
        symbol: impl Into<String>,
        bids: &[(f64, f64)],
        asks: &[(f64, f64)],
        last_update: Timestamp,
    ) -> Self {
        let mut depth = Self::new(symbol, last_update);
        let nanos = last_update.timestamp_nanos_opt().unwrap_or_default();
        for (i, (price, qty)) in bids.iter().take(MAX_LEVELS).enumerate() {
            depth.bids[i] = DepthLevel::new(*price, *qty, nanos);
        }
        for (i, (price, qty)) in asks.iter().take(MAX_LEVELS).enumerate() {
            depth.asks[i] = DepthLevel::new(*price, *qty, nanos);
        }
        depth
    }

    /// Overwrite one bid level. Out-of-range levels are ignored.
    pub fn update_bid(&mut self, level: usize, price: f64, quantity: f64, update_time: Timestamp) {
        if let Some(slot) = self.bids.get_mut(level) {
            *slot = DepthLevel::new(price, quantity, update_time.timestamp_nanos_opt().unwrap_or_default());
            self.last_update = update_time;
        }
    }

    /// Overwrite one ask level. Out-of-range levels are ignored.
    pub fn update_ask(&mut self, level: usize, price: f64, quantity: f64, update_time: Timestamp) {
        if let Some(slot) = self.asks.get_mut(level) {
            *slot = DepthLevel::new(price, quantity, update_time.timestamp_nanos_opt().unwrap_or_default());
            self.last_update = update_time;
        }
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids[0].is_quoted().then_some(self.bids[0].price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks[0].is_quoted().then_some(self.asks[0].price)
    }

    /// Midpoint of the touch; `None` unless both sides are quoted
    pub fn mid_price(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Quoted size resting on the bid side
    pub fn total_bid_liquidity(&self) -> f64 {
        self.bids
            .iter()
            .filter(|l| l.is_quoted())
            .map(|l| l.quantity)
            .sum()
    }

    /// Quoted size resting on the ask side
    pub fn total_ask_liquidity(&self) -> f64 {
        self.asks
            .iter()
            .filter(|l| l.is_quoted())
            .map(|l| l.quantity)
            .sum()
    }

    /// (bid - ask) / (bid + ask) volume over the first `levels` levels, in [-1, 1]
    pub fn imbalance(&self, levels: usize) -> f64 {
        let n = levels.min(MAX_LEVELS);
        let bid: f64 = self.bids[..n]
            .iter()
            .filter(|l| l.is_quoted())
            .map(|l| l.quantity)
            .sum();
        let ask: f64 = self.asks[..n]
            .iter()
            .filter(|l| l.is_quoted())
            .map(|l| l.quantity)
            .sum();
        let total = bid + ask;
        if total > 0.0 { (bid - ask) / total } else { 0.0 }
    }

    /// Volume-weighted price across the first `levels` levels of both sides.
    ///
    /// Falls back to the plain mid when no volume is quoted.
    pub fn weighted_mid(&self, levels: usize) -> Option<f64> {
        let n = levels.min(MAX_LEVELS);
        let (mut value, mut volume) = (0.0, 0.0);
        for level in self.bids[..n].iter().chain(self.asks[..n].iter()) {
            if level.is_quoted() {
                value += level.price * level.quantity;
                volume += level.quantity;
            }
        }
        if volume > 0.0 {
            Some(value / volume)
        } else {
            self.mid_price()
        }
    }

    /// Both sides quoted and not crossed
    pub fn is_valid(&self) -> bool {
        matches!((self.best_bid(), self.best_ask()), (Some(bid), Some(ask)) if bid < ask)
    }
}
