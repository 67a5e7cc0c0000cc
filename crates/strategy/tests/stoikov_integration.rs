//! Integration test: Stoikov strategy with live order and risk managers
//!
//! Tests the complete tick flow:
//! 1. Strategy receives book snapshots
//! 2. Quotes are placed through the order manager
//! 3. Fills move inventory and the next quotes lean against it
//! 4. A tripped circuit breaker stops new quotes
//! 5. Identical inputs reproduce identical quotes

use chrono::{DateTime, Duration, TimeZone, Utc};
use kestrel_clock::{Clock, ReplayClock};
use kestrel_core::{MarketDepth, Side};
use kestrel_order_manager::{OrderManager, OrderManagerConfig};
use kestrel_ports::Forecaster;
use kestrel_risk_manager::{RiskLimits, RiskManager};
use kestrel_strategy::{Action, Quote, StoikovConfig, StoikovStrategy, Strategy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap()
}

fn depth_at(mid: f64, t: DateTime<Utc>) -> MarketDepth {
    MarketDepth::from_levels(
        "XBTUSD",
        &[(mid - 0.05, 25.0), (mid - 0.10, 25.0)],
        &[(mid + 0.05, 25.0), (mid + 0.10, 25.0)],
        t,
    )
}

fn mids() -> Vec<f64> {
    // Deterministic wiggle around 100
    (0..120)
        .map(|i| 100.0 + ((i * 37 % 11) as f64 - 5.0) * 0.07)
        .collect()
}

struct Harness {
    clock: Arc<ReplayClock>,
    om: Arc<OrderManager>,
    rm: Arc<RiskManager>,
    strategy: StoikovStrategy,
}

fn harness(config: StoikovConfig) -> Harness {
    let clock = ReplayClock::new(start());
    let om = Arc::new(OrderManager::new(OrderManagerConfig::default(), clock.clone()));
    let rm = Arc::new(RiskManager::new(RiskLimits::default(), clock.clone()));
    let strategy = StoikovStrategy::new(config, om.clone(), rm.clone());
    Harness {
        clock,
        om,
        rm,
        strategy,
    }
}

fn run_quotes(config: StoikovConfig) -> Vec<Quote> {
    let mut h = harness(config);
    let mut quotes = Vec::new();
    for (i, mid) in mids().into_iter().enumerate() {
        let t = start() + Duration::seconds(i as i64);
        h.clock.set(t);
        h.strategy.on_market_data(&depth_at(mid, t));
        quotes.push(h.strategy.last_quote().unwrap().clone());
    }
    quotes
}

#[test]
fn test_quotes_are_deterministic() {
    let _ = env_logger::try_init();

    let a = run_quotes(StoikovConfig::default());
    let b = run_quotes(StoikovConfig::default());
    assert_eq!(a.len(), 120);
    assert_eq!(a, b);
    // Volatility picked up after the first two returns
    assert!(a[0].volatility == 0.0);
    assert!(a.last().unwrap().volatility > 0.0);
}

#[test]
fn test_tick_aligned_quotes() {
    let _ = env_logger::try_init();

    let quotes = run_quotes(StoikovConfig {
        tick_size: Some(0.01),
        ..Default::default()
    });
    let tick = dec!(0.01);
    for q in quotes {
        for px in [q.bid_price, q.ask_price] {
            let d = Decimal::try_from(px).unwrap();
            let ticks = (d / tick).round_dp(6);
            assert_eq!(ticks.fract(), Decimal::ZERO, "{} not on tick", px);
        }
        assert!(q.bid_price < q.ask_price);
    }
}

#[test]
fn test_quotes_both_sides_and_replaces_stale() {
    let _ = env_logger::try_init();

    let mut h = harness(StoikovConfig::default());
    let t0 = start();
    let actions = h.strategy.on_market_data(&depth_at(100.0, t0));
    let submits: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            Action::Submit(o) => Some(o.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(submits.len(), 2);
    assert_eq!(submits[0].side, Side::Buy);
    assert_eq!(submits[1].side, Side::Sell);
    assert!(submits[0].price < 100.0 && submits[1].price > 100.0);
    assert_eq!(h.om.active_order_count(), 2);

    // Next tick cancels both and requotes
    let t1 = t0 + Duration::seconds(1);
    h.clock.set(t1);
    let actions = h.strategy.on_market_data(&depth_at(100.0, t1));
    let cancels = actions
        .iter()
        .filter(|a| matches!(a, Action::Cancel(_)))
        .count();
    assert_eq!(cancels, 2);
    assert_eq!(h.om.active_order_count(), 2);
}

#[test]
fn test_inventory_skews_next_quotes() {
    let _ = env_logger::try_init();

    let mut h = harness(StoikovConfig::default());
    let t0 = start();
    // Build some volatility first
    for (i, mid) in [100.0, 100.4, 99.8, 100.3, 100.0].into_iter().enumerate() {
        let t = t0 + Duration::seconds(i as i64);
        h.clock.set(t);
        h.strategy.on_market_data(&depth_at(mid, t));
    }
    let flat = h.strategy.last_quote().unwrap().clone();

    // Our bid gets lifted
    let bid = h
        .om
        .get_active_orders()
        .into_iter()
        .find(|o| o.side == Side::Buy)
        .unwrap();
    h.om.update_order(&bid.with_fill(bid.quantity, h.clock.now()))
        .unwrap();
    assert!(h.strategy.position() > 0.0);

    let t = t0 + Duration::seconds(5);
    h.clock.set(t);
    h.strategy.on_market_data(&depth_at(100.0, t));
    let long = h.strategy.last_quote().unwrap();
    assert!(long.reservation_price < flat.reservation_price);
    assert!(long.bid_size < long.ask_size);
}

#[test]
fn test_halted_strategy_stops_quoting() {
    let _ = env_logger::try_init();

    let mut h = harness(StoikovConfig::default());
    let t0 = start();
    h.strategy.on_market_data(&depth_at(100.0, t0));
    assert_eq!(h.om.active_order_count(), 2);

    h.rm.halt_trading("test");
    for i in 1..5 {
        let t = t0 + Duration::seconds(i);
        h.clock.set(t);
        let actions = h.strategy.on_market_data(&depth_at(100.0, t));
        assert!(actions.iter().all(|a| matches!(a, Action::Cancel(_))));
    }
    // Resting quotes were pulled and nothing new went out
    assert_eq!(h.om.active_order_count(), 0);
}

#[test]
fn test_session_horizon_ends_quoting() {
    let _ = env_logger::try_init();

    let mut h = harness(StoikovConfig {
        time_horizon: 1.0 / 24.0, // one hour
        ..Default::default()
    });
    let t0 = start();
    assert!(!h.strategy.on_market_data(&depth_at(100.0, t0)).is_empty());

    let late = t0 + Duration::hours(2);
    h.clock.set(late);
    let actions = h.strategy.on_market_data(&depth_at(100.0, late));
    assert!(actions.iter().all(|a| matches!(a, Action::Cancel(_))));
    assert_eq!(h.om.active_order_count(), 0);
}

struct Bullish;

impl Forecaster for Bullish {
    fn predict(&self, features: &[f64]) -> Option<Vec<f64>> {
        features.first().map(|mid| vec![mid + 1.0])
    }
}

struct Silent;

impl Forecaster for Silent {
    fn predict(&self, _features: &[f64]) -> Option<Vec<f64>> {
        None
    }
}

#[test]
fn test_forecaster_shifts_reservation_only_when_weighted() {
    let _ = env_logger::try_init();

    let weighted = StoikovConfig {
        forecast_weight: 0.5,
        ..Default::default()
    };
    let t0 = start();

    let mut h = harness(weighted.clone());
    h.strategy = StoikovStrategy::new(weighted.clone(), h.om.clone(), h.rm.clone())
        .with_forecaster(Arc::new(Bullish));
    h.strategy.on_market_data(&depth_at(100.0, t0));
    assert!((h.strategy.last_quote().unwrap().reservation_price - 100.5).abs() < 1e-9);

    let mut h = harness(weighted.clone());
    h.strategy =
        StoikovStrategy::new(weighted, h.om.clone(), h.rm.clone()).with_forecaster(Arc::new(Silent));
    h.strategy.on_market_data(&depth_at(100.0, t0));
    assert_eq!(h.strategy.last_quote().unwrap().reservation_price, 100.0);

    let mut h = harness(StoikovConfig::default());
    h.strategy = StoikovStrategy::new(StoikovConfig::default(), h.om.clone(), h.rm.clone())
        .with_forecaster(Arc::new(Bullish));
    h.strategy.on_market_data(&depth_at(100.0, t0));
    assert_eq!(h.strategy.last_quote().unwrap().reservation_price, 100.0);
}
