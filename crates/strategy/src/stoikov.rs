//! Stoikov Optimal Market Maker
//!
//! Quotes around an inventory-adjusted reservation price:
//!
//! ```text
//! r      = mid − q × γ × σ² × T_remaining
//! spread = (2/γ) × ln(1 + γ/k)
//! ask    = r + spread/2
//! bid    = r − spread/2
//! ```
//!
//! Where:
//! - γ = risk aversion
//! - k = order-book liquidity (market impact) parameter
//! - q = current inventory (positive = long)
//! - σ = annualized volatility of mid log returns
//! - T_remaining = session horizon left, in days
//!
//! Fill intensity decays exponentially with distance from mid, and quote
//! sizes lean against inventory: a long book bids smaller and offers larger.

use crate::strategy::{Action, Strategy};
use crate::volatility::VolatilityEstimator;
use kestrel_core::{MarketDepth, OrderId, Side, Timestamp};
use kestrel_order_manager::OrderManager;
use kestrel_ports::Forecaster;
use kestrel_risk_manager::RiskManager;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Configuration for the Stoikov market maker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoikovConfig {
    /// Risk aversion γ. Higher = wider reservation skew.
    pub risk_aversion: f64,
    /// Liquidity parameter k of the intensity model
    pub market_impact: f64,
    /// Log returns kept by the volatility estimator
    pub volatility_window: usize,
    /// Inventory the strategy leans towards
    pub inventory_target: f64,
    /// Session horizon T in days
    pub time_horizon: f64,
    /// Sides with a lower fill intensity are not quoted
    pub min_intensity: f64,
    /// Inventory that normalizes the size skew
    pub position_limit: f64,
    /// Quote size at zero skew
    pub base_size: f64,
    /// Round bids down and asks up to this tick
    pub tick_size: Option<f64>,
    /// Cancel our resting quotes before requoting
    pub cancel_stale_quotes: bool,
    /// Weight of (forecast − mid) added to the reservation price
    pub forecast_weight: f64,
}

impl Default for StoikovConfig {
    fn default() -> Self {
        Self {
            risk_aversion: 0.1,
            market_impact: 1.5,
            volatility_window: 100,
            inventory_target: 0.0,
            time_horizon: 1.0,   // one trading day
            min_intensity: 0.01,
            position_limit: 10.0,
            base_size: 1.0,
            tick_size: None,
            cancel_stale_quotes: true,
            forecast_weight: 0.0, // forecasts ignored unless weighted
        }
    }
}

/// Everything a quote depends on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteInputs {
    pub mid: f64,
    pub volatility: f64,
    pub inventory: f64,
    pub elapsed_days: f64,
    /// Model forecast of the next mid, if any
    pub forecast: Option<f64>,
}

/// Output of one quoting decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub mid: f64,
    pub volatility: f64,
    pub time_remaining: f64,
    pub reservation_price: f64,
    pub spread: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_size: f64,
    pub ask_size: f64,
    pub bid_intensity: f64,
    pub ask_intensity: f64,
}

impl Quote {
    pub fn quote_bid(&self, config: &StoikovConfig) -> bool {
        self.bid_size > 0.0 && self.bid_intensity > config.min_intensity
    }

    pub fn quote_ask(&self, config: &StoikovConfig) -> bool {
        self.ask_size > 0.0 && self.ask_intensity > config.min_intensity
    }
}

/// Pure quoting function. `None` once the session horizon is used up.
pub fn compute_quote(inputs: &QuoteInputs, config: &StoikovConfig) -> Option<Quote> {
    let gamma = config.risk_aversion;
    let k = config.market_impact;
    let mid = inputs.mid;

    let time_remaining = config.time_horizon - inputs.elapsed_days;
    if time_remaining <= 0.0 {
        return None;
    }

    let sigma_sq = inputs.volatility * inputs.volatility;
    let mut reservation_price = mid - inputs.inventory * gamma * sigma_sq * time_remaining;
    if let Some(forecast) = inputs.forecast {
        reservation_price += config.forecast_weight * (forecast - mid);
    }

    let spread = (2.0 / gamma) * (1.0 + gamma / k).ln();
    let mut ask_price = reservation_price + spread / 2.0;
    let mut bid_price = reservation_price - spread / 2.0;
    if let Some(tick) = config.tick_size {
        bid_price = round_to_tick(bid_price, tick, true);
        ask_price = round_to_tick(ask_price, tick, false);
    }

    let base_intensity = mid / (200.0 * config.time_horizon);
    let ask_intensity = base_intensity * (-k * (ask_price - mid)).exp();
    let bid_intensity = base_intensity * (-k * (mid - bid_price)).exp();

    let skew = (inputs.inventory - config.inventory_target) / config.position_limit;
    let bid_size = config.base_size * (-gamma * skew).exp();
    let ask_size = config.base_size * (gamma * skew).exp();

    Some(Quote {
        mid,
        volatility: inputs.volatility,
        time_remaining,
        reservation_price,
        spread,
        bid_price,
        ask_price,
        bid_size,
        ask_size,
        bid_intensity,
        ask_intensity,
    })
}

/// Round price to tick size: down for bids, up for asks
fn round_to_tick(price: f64, tick: f64, is_bid: bool) -> f64 {
    let (Some(p), Some(t)) = (Decimal::from_f64(price), Decimal::from_f64(tick)) else {
        return price;
    };
    if t <= Decimal::ZERO {
        return price;
    }
    let ticks = p / t;
    let rounded = if is_bid { ticks.floor() } else { ticks.ceil() };
    (rounded * t).to_f64().unwrap_or(price)
}

/// Stoikov market maker bound to one symbol's order and risk managers
pub struct StoikovStrategy {
    name: String,
    config: StoikovConfig,
    order_manager: Arc<OrderManager>,
    risk_manager: Arc<RiskManager>,
    volatility: VolatilityEstimator,
    forecaster: Option<Arc<dyn Forecaster>>,
    /// Time of the first tick; the session horizon counts from here
    session_start: Option<Timestamp>,
    /// Our orders that may still be resting
    working: Vec<OrderId>,
    last_quote: Option<Quote>,
    halt_reported: bool,
}

impl StoikovStrategy {
    pub fn new(
        config: StoikovConfig,
        order_manager: Arc<OrderManager>,
        risk_manager: Arc<RiskManager>,
    ) -> Self {
        let name = format!("stoikov-{}", order_manager.config().symbol);
        info!(
            "[STOIKOV] {} up: gamma={}, k={}, horizon={}d, base_size={}",
            name, config.risk_aversion, config.market_impact, config.time_horizon, config.base_size
        );
        Self {
            name,
            volatility: VolatilityEstimator::new(config.volatility_window),
            config,
            order_manager,
            risk_manager,
            forecaster: None,
            session_start: None,
            working: Vec::new(),
            last_quote: None,
            halt_reported: false,
        }
    }

    /// Attach a forecasting model; it only moves quotes when `forecast_weight` is non-zero
    pub fn with_forecaster(mut self, forecaster: Arc<dyn Forecaster>) -> Self {
        self.forecaster = Some(forecaster);
        self
    }

    pub fn config(&self) -> &StoikovConfig {
        &self.config
    }

    pub fn last_quote(&self) -> Option<&Quote> {
        self.last_quote.as_ref()
    }

    pub fn volatility(&self) -> f64 {
        self.volatility.volatility()
    }

    fn forecast(&self, depth: &MarketDepth, mid: f64) -> Option<f64> {
        if self.config.forecast_weight == 0.0 {
            return None;
        }
        let model = self.forecaster.as_ref()?;
        let features = [
            mid,
            depth.spread().unwrap_or_default(),
            depth.imbalance(5),
            self.volatility.volatility(),
        ];
        let forecast = model.predict(&features).and_then(|v| v.first().copied());
        if forecast.is_none() {
            debug!("[STOIKOV] No forecast available");
        }
        forecast.filter(|f| f.is_finite())
    }

    fn cancel_working(&mut self) -> Vec<Action> {
        let om = &self.order_manager;
        self.working
            .drain(..)
            .filter(|id| om.cancel_order(*id))
            .map(Action::Cancel)
            .collect()
    }

    fn place(&mut self, side: Side, price: f64, size: f64, actions: &mut Vec<Action>) {
        if let Some(order) = self.order_manager.place_order(side, price, size) {
            self.working.push(order.id);
            actions.push(Action::Submit(order));
        }
    }
}

impl Strategy for StoikovStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_market_data(&mut self, depth: &MarketDepth) -> Vec<Action> {
        let Some(mid) = depth.mid_price() else {
            debug!("[STOIKOV] No mid price available, skipping quotes");
            return Vec::new();
        };

        self.volatility.update(mid);
        let start = *self.session_start.get_or_insert(depth.last_update);
        let elapsed_ms = (depth.last_update - start).num_milliseconds() as f64;

        let inputs = QuoteInputs {
            mid,
            volatility: self.volatility.volatility(),
            inventory: self.order_manager.position(),
            elapsed_days: elapsed_ms / MILLIS_PER_DAY,
            forecast: self.forecast(depth, mid),
        };
        let Some(quote) = compute_quote(&inputs, &self.config) else {
            debug!("[STOIKOV] Session horizon elapsed, not quoting");
            return self.cancel_working();
        };
        self.last_quote = Some(quote.clone());

        let mut actions = if self.config.cancel_stale_quotes || self.risk_manager.is_halted() {
            self.cancel_working()
        } else {
            let om = &self.order_manager;
            self.working.retain(|id| om.get_order(*id).is_some());
            Vec::new()
        };

        if self.risk_manager.is_halted() {
            if !self.halt_reported {
                warn!("[STOIKOV] {} trading halted, no new quotes", self.name);
                self.halt_reported = true;
            }
            return actions;
        }
        self.halt_reported = false;

        if quote.quote_bid(&self.config) {
            self.place(Side::Buy, quote.bid_price, quote.bid_size, &mut actions);
        }
        if quote.quote_ask(&self.config) {
            self.place(Side::Sell, quote.ask_price, quote.ask_size, &mut actions);
        }
        debug!(
            "[STOIKOV] mid={:.4} r={:.4} bid={:.4}x{:.4} ask={:.4}x{:.4} q={}",
            mid,
            quote.reservation_price,
            quote.bid_price,
            quote.bid_size,
            quote.ask_price,
            quote.ask_size,
            inputs.inventory
        );
        actions
    }

    fn position(&self) -> f64 {
        self.order_manager.position()
    }

    fn on_shutdown(&mut self) -> Vec<Action> {
        self.cancel_working()
    }
}
