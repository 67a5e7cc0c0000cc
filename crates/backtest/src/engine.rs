//! Backtest Engine
//!
//! Replays recorded snapshots through the same strategy, order manager and
//! risk manager used live. The replay clock is moved to each snapshot's
//! timestamp before anything else sees it, so every component observes
//! historical time.
//!
//! ```text
//!   snapshot ──► clock.set ──► Strategy ──► OrderManager (new orders)
//!                                               │
//!                              RiskManager ◄────┘ check_order_risk (once per order)
//!                                   │ pass
//!                              FillModel ──► update_order ──► update_metrics
//!                                   │
//!                       costs, slippage, equity, drawdown
//! ```

use crate::analytics;
use crate::config::BacktestConfig;
use crate::data;
use crate::error::Result;
use crate::fill_model::{FillModel, TouchFill};
use crate::performance::{PerformanceMonitor, log_returns};
use crate::results::{BacktestResults, BacktestSummary, TradeRecord};
use kestrel_clock::ReplayClock;
use kestrel_core::{Fill, MarketDepth, OrderId, Side, Timestamp};
use kestrel_order_manager::OrderManager;
use kestrel_risk_manager::{RiskCheck, RiskManager};
use kestrel_strategy::Strategy;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

/// Cost of one simulated fill
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecutionCosts {
    pub transaction_cost: f64,
    pub slippage: f64,
    pub market_impact: f64,
}

pub struct BacktestEngine<S: Strategy> {
    config: BacktestConfig,
    strategy: S,
    order_manager: Arc<OrderManager>,
    risk_manager: Arc<RiskManager>,
    clock: Arc<ReplayClock>,
    fill_model: Box<dyn FillModel>,
}

impl<S: Strategy> BacktestEngine<S> {
    /// The managers must read time from `clock`
    pub fn new(
        config: BacktestConfig,
        strategy: S,
        order_manager: Arc<OrderManager>,
        risk_manager: Arc<RiskManager>,
        clock: Arc<ReplayClock>,
    ) -> Self {
        Self {
            config,
            strategy,
            order_manager,
            risk_manager,
            clock,
            fill_model: Box::new(TouchFill),
        }
    }

    pub fn with_fill_model(mut self, model: impl FillModel + 'static) -> Self {
        self.fill_model = Box::new(model);
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn order_manager(&self) -> &Arc<OrderManager> {
        &self.order_manager
    }

    pub fn risk_manager(&self) -> &Arc<RiskManager> {
        &self.risk_manager
    }

    /// Replay `snapshots` in order and collect the results
    pub fn run(&mut self, snapshots: &[MarketDepth]) -> Result<BacktestResults> {
        data::validate(snapshots)?;

        let warm_up = self.config.warm_up_bars.min(snapshots.len());
        info!(
            "[BACKTEST] Starting {}: {} snapshots, {} warm-up",
            self.strategy.name(),
            snapshots.len(),
            warm_up
        );

        for depth in &snapshots[..warm_up] {
            self.clock.set(depth.last_update);
            self.strategy.on_market_data(depth);
        }
        if warm_up > 0 {
            let cancelled = self.order_manager.cancel_all();
            debug!("[BACKTEST] Warm-up done, cancelled {} resting orders", cancelled.len());
        }

        let main = &snapshots[warm_up..];
        if let Some(first) = main.first() {
            self.clock.set(first.last_update);
            self.risk_manager.reset_daily_metrics();
        }

        let mut replay = Replay::new(&self.config);
        let mut routed: HashSet<OrderId> = HashSet::new();

        for depth in main {
            self.clock.set(depth.last_update);
            let actions = self.strategy.on_market_data(depth);
            debug!("[BACKTEST] {} actions at {}", actions.len(), depth.last_update);

            self.route_new_orders(depth, &mut routed);
            self.simulate_fills(depth, &routed, &mut replay);
            let om = &self.order_manager;
            routed.retain(|id| om.get_order(*id).is_some());

            replay.mark(depth, self.order_manager.position());

            if replay.halted_at.is_none() && self.risk_manager.is_halted() {
                let at = self.risk_manager.trigger_time().unwrap_or(depth.last_update);
                warn!("[BACKTEST] Circuit breaker tripped at {}", at);
                replay.halted_at = Some(at);
                if self.config.stop_on_halt {
                    info!("[BACKTEST] Stopping replay on halt");
                    break;
                }
            }
        }

        for action in self.strategy.on_shutdown() {
            debug!("[BACKTEST] Shutdown action: {:?}", action);
        }

        let bars = replay.results.equity_curve.len();
        let results = replay.finish(&main[..bars]);
        info!(
            "[BACKTEST] Done: {} bars, {} trades, return {:.4}%, sharpe {:.2}, max drawdown {:.4}%",
            bars,
            results.summary.trade_count,
            results.metrics.total_return * 100.0,
            results.metrics.sharpe_ratio,
            results.metrics.max_drawdown * 100.0
        );
        Ok(results)
    }

    /// Risk-check orders the strategy placed since the last bar. Rejected
    /// orders are closed as Rejected; accepted ones become fillable.
    fn route_new_orders(&self, depth: &MarketDepth, routed: &mut HashSet<OrderId>) {
        for order in self.order_manager.get_active_orders() {
            if routed.contains(&order.id) {
                continue;
            }
            match self.risk_manager.check_order_risk(&order, depth) {
                RiskCheck::Pass => {
                    routed.insert(order.id);
                }
                RiskCheck::Reject(reason) => {
                    debug!("[BACKTEST] Order {} rejected by risk: {}", order.id, reason);
                    self.order_manager.reject_order(order.id);
                }
            }
        }
    }

    fn simulate_fills(&mut self, depth: &MarketDepth, routed: &HashSet<OrderId>, replay: &mut Replay) {
        let mid = depth.mid_price().or(replay.last_mid).unwrap_or_default();

        for order in self.order_manager.get_active_orders() {
            if !routed.contains(&order.id) {
                continue;
            }
            let quantity = self
                .fill_model
                .fill_quantity(&order, depth)
                .min(order.remaining_quantity());
            if quantity.is_nan() || quantity <= 0.0 {
                continue;
            }

            let snapshot = order.with_fill(order.filled_quantity + quantity, depth.last_update);
            match self.order_manager.update_order(&snapshot) {
                Ok(Some(fill)) => {
                    let costs = self.execution_costs(&fill, depth);
                    self.risk_manager.update_metrics(&fill, depth);
                    replay.apply_fill(&fill, costs, mid);
                }
                Ok(None) => {}
                Err(e) => warn!("[BACKTEST] Simulated fill for order {} refused: {}", order.id, e),
            }
        }
    }

    /// Transaction cost plus slippage scaled by the fill's share of the
    /// liquidity on the side it trades against
    pub fn execution_costs(&self, fill: &Fill, depth: &MarketDepth) -> ExecutionCosts {
        let notional = fill.price * fill.quantity;
        let transaction_cost = if self.config.include_transaction_costs {
            notional * self.config.transaction_cost_bps / 10_000.0
        } else {
            0.0
        };

        let (slippage, market_impact) = if self.config.include_slippage {
            let base = notional * self.config.slippage_bps / 10_000.0;
            let liquidity = match fill.side {
                Side::Buy => depth.total_ask_liquidity(),
                Side::Sell => depth.total_bid_liquidity(),
            };
            let share = if liquidity > 0.0 {
                fill.quantity / liquidity
            } else {
                1.0
            };
            let impact = base * share;
            (base + impact, impact)
        } else {
            (0.0, 0.0)
        };

        ExecutionCosts {
            transaction_cost,
            slippage,
            market_impact,
        }
    }
}

/// Accumulators owned by one run
struct Replay {
    initial_capital: f64,
    cash: f64,
    high_water_mark: f64,
    last_mid: Option<f64>,
    mids: Vec<f64>,
    traded_notional: f64,
    position_sum: f64,
    max_position: f64,
    max_leverage: f64,
    total_transaction_costs: f64,
    total_slippage: f64,
    total_market_impact: f64,
    halted_at: Option<Timestamp>,
    monitor: PerformanceMonitor,
    results: BacktestResults,
}

impl Replay {
    fn new(config: &BacktestConfig) -> Self {
        Self {
            initial_capital: config.initial_capital,
            cash: config.initial_capital,
            high_water_mark: config.initial_capital,
            last_mid: None,
            mids: Vec::new(),
            traded_notional: 0.0,
            position_sum: 0.0,
            max_position: 0.0,
            max_leverage: 0.0,
            total_transaction_costs: 0.0,
            total_slippage: 0.0,
            total_market_impact: 0.0,
            halted_at: None,
            monitor: PerformanceMonitor::new(config.periods_per_year),
            results: BacktestResults::default(),
        }
    }

    fn apply_fill(&mut self, fill: &Fill, costs: ExecutionCosts, mid: f64) {
        self.cash += fill.cash_flow() - costs.transaction_cost - costs.slippage;
        self.traded_notional += fill.price * fill.quantity;
        self.total_transaction_costs += costs.transaction_cost;
        self.total_slippage += costs.slippage;
        self.total_market_impact += costs.market_impact;
        self.monitor.record_trade(fill.side, fill.price, mid);
        self.results.trade_history.push(TradeRecord {
            timestamp: fill.timestamp,
            order_id: fill.order_id,
            side: fill.side,
            price: fill.price,
            quantity: fill.quantity,
            mid,
            transaction_cost: costs.transaction_cost,
            slippage: costs.slippage,
            market_impact: costs.market_impact,
        });
    }

    /// Close the bar: mark the position to the mid and extend the curves
    fn mark(&mut self, depth: &MarketDepth, position: f64) {
        if let Some(mid) = depth.mid_price() {
            self.last_mid = Some(mid);
        }
        let mid = self.last_mid.unwrap_or_default();
        let equity = self.cash + position * mid;

        self.high_water_mark = self.high_water_mark.max(equity);
        let drawdown = if self.high_water_mark > 0.0 {
            (self.high_water_mark - equity) / self.high_water_mark
        } else {
            0.0
        };

        self.position_sum += position.abs();
        self.max_position = self.max_position.max(position.abs());
        if equity > 0.0 {
            self.max_leverage = self.max_leverage.max((position * mid).abs() / equity);
        }

        self.mids.push(mid);
        self.results.timestamps.push(depth.last_update);
        self.results.equity_curve.push(equity);
        self.results.drawdown_curve.push(drawdown);
        self.results.position_history.push((mid, position));
    }

    fn finish(mut self, replayed: &[MarketDepth]) -> BacktestResults {
        let bars = self.results.equity_curve.len();
        let final_equity = self.results.final_equity().unwrap_or(self.initial_capital);

        let mut equity = Vec::with_capacity(bars + 1);
        equity.push(self.initial_capital);
        equity.extend_from_slice(&self.results.equity_curve);
        let returns = log_returns(&equity);

        let mut benchmark = Vec::with_capacity(bars + 1);
        benchmark.extend(self.mids.first().copied());
        benchmark.extend_from_slice(&self.mids);
        let benchmark_returns = log_returns(&benchmark);

        let max_drawdown = self
            .results
            .drawdown_curve
            .iter()
            .copied()
            .fold(0.0, f64::max);

        self.results.metrics = self.monitor.calculate(
            self.initial_capital,
            final_equity,
            &returns,
            &benchmark_returns,
            max_drawdown,
            bars,
        );

        let trade_count = self.results.trade_history.len();
        self.results.summary = BacktestSummary {
            initial_capital: self.initial_capital,
            final_equity,
            max_leverage_used: self.max_leverage,
            avg_position: if bars == 0 {
                0.0
            } else {
                self.position_sum / bars as f64
            },
            max_position: self.max_position,
            turnover_ratio: if self.initial_capital > 0.0 {
                self.traded_notional / self.initial_capital
            } else {
                0.0
            },
            avg_market_impact: if trade_count == 0 {
                0.0
            } else {
                self.total_market_impact / trade_count as f64
            },
            total_transaction_costs: self.total_transaction_costs,
            total_slippage: self.total_slippage,
            trade_count,
            bars,
            halted_at: self.halted_at,
        };
        self.results.analytics = analytics::analyze(replayed, &self.results.trade_history);
        self.results
    }
}
