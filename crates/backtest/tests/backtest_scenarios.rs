//! Integration test: full replays of the Stoikov strategy
//!
//! Each scenario wires a fresh order manager, risk manager and strategy to a
//! replay clock, exactly as the `kestrel backtest` command does.

use chrono::Utc;
use kestrel_backtest::synthetic::{flat_series, gbm_series, linear_series};
use kestrel_backtest::{
    BacktestConfig, BacktestEngine, BacktestError, FillModel, ImmediateFill,
};
use kestrel_clock::ReplayClock;
use kestrel_core::{MarketDepth, Order, Side};
use kestrel_order_manager::{OrderManager, OrderManagerConfig};
use kestrel_risk_manager::{BreakerConfig, RiskLimits, RiskManager};
use kestrel_strategy::{StoikovConfig, StoikovStrategy};
use std::sync::Arc;

const INITIAL_CAPITAL: f64 = 1_000_000.0;

/// Fills every bid in full and never lifts an offer
struct BuyOnly;

impl FillModel for BuyOnly {
    fn fill_quantity(&mut self, order: &Order, _depth: &MarketDepth) -> f64 {
        match order.side {
            Side::Buy => order.remaining_quantity(),
            Side::Sell => 0.0,
        }
    }
}

fn engine_with(
    config: BacktestConfig,
    om_config: OrderManagerConfig,
    limits: RiskLimits,
) -> BacktestEngine<StoikovStrategy> {
    let clock = ReplayClock::new(Utc::now());
    let om = Arc::new(OrderManager::new(om_config, clock.clone()));
    let rm = Arc::new(RiskManager::new(limits, clock.clone()));
    let strategy = StoikovStrategy::new(StoikovConfig::default(), om.clone(), rm.clone());
    BacktestEngine::new(config, strategy, om, rm, clock)
}

fn frictionless(warm_up_bars: usize) -> BacktestConfig {
    BacktestConfig {
        initial_capital: INITIAL_CAPITAL,
        warm_up_bars,
        ..Default::default()
    }
    .frictionless()
}

fn roomy_order_limits() -> OrderManagerConfig {
    OrderManagerConfig {
        max_position: 1_000.0,
        max_notional: 1_000_000.0,
        ..Default::default()
    }
}

#[test]
fn test_flat_market_keeps_capital() {
    let _ = env_logger::try_init();

    let mut engine = engine_with(
        frictionless(50),
        OrderManagerConfig::default(),
        RiskLimits::default(),
    );
    let results = engine.run(&flat_series("XBTUSD", 100.0, 200)).unwrap();

    assert_eq!(results.equity_curve.len(), 150);
    assert!(results.equity_curve.iter().all(|e| *e == INITIAL_CAPITAL));
    assert_eq!(results.metrics.max_drawdown, 0.0);
    assert_eq!(results.metrics.total_return, 0.0);
    assert!(results.drawdown_curve.iter().all(|d| *d == 0.0));
    assert_eq!(results.summary.trade_count, 0);
    assert_eq!(results.summary.halted_at, None);
}

#[test]
fn test_flat_market_fills_book_spread_capture() {
    let _ = env_logger::try_init();

    let mut engine = engine_with(
        frictionless(50),
        OrderManagerConfig::default(),
        RiskLimits::default(),
    )
    .with_fill_model(ImmediateFill);
    let results = engine.run(&flat_series("XBTUSD", 100.0, 200)).unwrap();
    assert!(results.summary.trade_count > 0);

    let captured: f64 = results
        .trade_history
        .iter()
        .map(|t| match t.side {
            Side::Buy => (t.mid - t.price) * t.quantity,
            Side::Sell => (t.price - t.mid) * t.quantity,
        })
        .sum();
    assert!(captured > 0.0);

    let final_equity = results.summary.final_equity;
    assert!((final_equity - INITIAL_CAPITAL - captured).abs() < 1e-6);
    assert!(results.equity_curve.iter().all(|e| *e >= INITIAL_CAPITAL));
    assert_eq!(results.metrics.max_drawdown, 0.0);
    assert!(results.drawdown_curve.iter().all(|d| *d == 0.0));
}

#[test]
fn test_rising_market_with_long_fills_is_profitable() {
    let _ = env_logger::try_init();

    let mut engine = engine_with(frictionless(50), roomy_order_limits(), RiskLimits::default())
        .with_fill_model(BuyOnly);
    let results = engine
        .run(&linear_series("XBTUSD", 100.0, 0.05, 200))
        .unwrap();

    assert!(results.summary.trade_count > 0);
    assert!(results.trade_history.iter().all(|t| t.side == Side::Buy));
    assert!(results.metrics.total_return > 0.0);
    assert!(results.metrics.win_rate > 0.5);
    assert!(results.summary.max_position > 0.0);
    assert_eq!(results.summary.total_transaction_costs, 0.0);
    assert_eq!(results.summary.total_slippage, 0.0);
}

#[test]
fn test_costs_are_debited() {
    let _ = env_logger::try_init();

    let config = BacktestConfig {
        initial_capital: INITIAL_CAPITAL,
        warm_up_bars: 10,
        ..Default::default()
    };
    let mut engine = engine_with(config, roomy_order_limits(), RiskLimits::default())
        .with_fill_model(ImmediateFill);
    let results = engine.run(&flat_series("XBTUSD", 100.0, 30)).unwrap();

    let summary = &results.summary;
    assert!(summary.trade_count > 0);
    assert!(summary.total_transaction_costs > 0.0);
    assert!(summary.total_slippage > summary.total_transaction_costs);
    assert!(summary.turnover_ratio > 0.0);
}

#[test]
fn test_out_of_order_input_is_rejected() {
    let _ = env_logger::try_init();

    let mut series = flat_series("XBTUSD", 100.0, 20);
    series.swap(7, 8);

    let mut engine = engine_with(
        frictionless(5),
        OrderManagerConfig::default(),
        RiskLimits::default(),
    );
    assert!(matches!(
        engine.run(&series),
        Err(BacktestError::OutOfOrder { index: 8 })
    ));
    assert!(matches!(engine.run(&[]), Err(BacktestError::NoData)));
}

fn tight_breaker() -> RiskLimits {
    RiskLimits {
        breaker: BreakerConfig {
            loss_threshold: 50.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_halt_is_recorded_and_replay_continues() {
    let _ = env_logger::try_init();

    let series = linear_series("XBTUSD", 100.0, 0.05, 100);
    let mut engine = engine_with(frictionless(20), roomy_order_limits(), tight_breaker())
        .with_fill_model(BuyOnly);
    let results = engine.run(&series).unwrap();

    assert_eq!(results.summary.halted_at, Some(series[20].last_update));
    assert_eq!(results.equity_curve.len(), 80);
    // Nothing trades once the breaker is open
    assert_eq!(results.summary.trade_count, 1);
    assert!(engine.risk_manager().is_halted());
}

#[test]
fn test_stop_on_halt_ends_replay() {
    let _ = env_logger::try_init();

    let series = linear_series("XBTUSD", 100.0, 0.05, 100);
    let config = BacktestConfig {
        stop_on_halt: true,
        ..frictionless(20)
    };
    let mut engine =
        engine_with(config, roomy_order_limits(), tight_breaker()).with_fill_model(BuyOnly);
    let results = engine.run(&series).unwrap();

    assert_eq!(results.equity_curve.len(), 1);
    assert_eq!(results.summary.bars, 1);
    assert!(results.summary.halted_at.is_some());
}

#[test]
fn test_replay_is_deterministic() {
    let _ = env_logger::try_init();

    let series = gbm_series("XBTUSD", 100.0, 0.0, 0.004, 300, 42);
    let run = || {
        engine_with(frictionless(50), roomy_order_limits(), RiskLimits::default())
            .run(&series)
            .unwrap()
    };
    let (a, b) = (run(), run());
    assert_eq!(a.equity_curve, b.equity_curve);
    assert_eq!(a.trade_history.len(), b.trade_history.len());
    assert_eq!(a.metrics, b.metrics);
}
