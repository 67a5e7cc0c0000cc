//! Integration test: ExecutionManager <-> SimulatedConnector
//!
//! Exercises the retry policy end to end with tokio's paused clock, so the
//! configured delays are observed without slowing the suite.

use chrono::Utc;
use kestrel_core::{MarketDepth, Order, OrderStatus, Side};
use kestrel_gateway::{
    ExecutionConfig, ExecutionManager, PreTradeViolation, SimulatedConnector, SubmitOutcome,
};
use kestrel_ports::{ConnectorError, ExchangeConnector};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn order(id: u64, side: Side, price: f64, qty: f64) -> Order {
    Order::new_with_time(id, "XBTUSD", side, price, qty, Utc::now())
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_uses_exactly_max_attempts() {
    let _ = env_logger::try_init();

    let connector = Arc::new(SimulatedConnector::new());
    connector.fail_next(10);
    let config = ExecutionConfig {
        max_retry_attempts: 4,
        retry_delay_ms: 250,
        ..Default::default()
    };
    let exec = ExecutionManager::new(config, connector.clone());

    let start = Instant::now();
    let outcome = exec.submit_order(&order(1, Side::Buy, 100.0, 1.0)).await;

    assert_eq!(
        outcome,
        SubmitOutcome::Exhausted {
            attempts: 4,
            last_error: Some(ConnectorError::Timeout),
        }
    );
    assert_eq!(connector.order_calls(), 4);
    assert!(connector.submissions().is_empty());

    // Three pauses between four attempts, none after the last
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(750));
    assert!(elapsed < Duration::from_millis(1_000));
}

#[tokio::test(start_paused = true)]
async fn test_declines_count_as_attempts() {
    let _ = env_logger::try_init();

    let connector = Arc::new(SimulatedConnector::new());
    connector.decline_next(2);
    let exec = ExecutionManager::new(ExecutionConfig::default(), connector.clone());

    let outcome = exec.submit_order(&order(1, Side::Sell, 100.0, 2.0)).await;
    assert_eq!(outcome, SubmitOutcome::Submitted { attempts: 3 });
    assert_eq!(connector.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connectivity_loss_is_reported() {
    let _ = env_logger::try_init();

    let connector = Arc::new(SimulatedConnector::new());
    connector.fail_next_with(3, ConnectorError::ConnectivityLost("socket closed".into()));
    let exec = ExecutionManager::new(ExecutionConfig::default(), connector.clone());

    let outcome = exec.submit_order(&order(1, Side::Buy, 100.0, 1.0)).await;
    assert!(outcome.lost_connectivity());
    assert_eq!(outcome.attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_pre_trade_rejections_make_no_order_calls() {
    let _ = env_logger::try_init();

    let connector = Arc::new(SimulatedConnector::new());
    let exec = ExecutionManager::new(ExecutionConfig::default(), connector.clone());

    let too_big = exec.submit_order(&order(1, Side::Buy, 1_000.0, 11.0)).await;
    assert!(matches!(
        too_big,
        SubmitOutcome::Rejected(PreTradeViolation::OrderValue { .. })
    ));

    connector.set_query_error(Some(ConnectorError::SystemError("maintenance".into())));
    let unknown = exec.submit_order(&order(2, Side::Buy, 100.0, 1.0)).await;
    assert!(matches!(
        unknown,
        SubmitOutcome::Rejected(PreTradeViolation::PositionUnavailable(_))
    ));

    assert_eq!(connector.order_calls(), 0);
    assert_eq!(
        exec.stats()
            .rejected
            .load(std::sync::atomic::Ordering::Relaxed),
        2
    );
}

#[tokio::test]
async fn test_auto_fill_round_trip() {
    let _ = env_logger::try_init();

    let connector = Arc::new(SimulatedConnector::new().with_auto_fill());
    let mut executions = connector.subscribe_executions();
    let exec = ExecutionManager::new(ExecutionConfig::default(), connector.clone());

    let book = MarketDepth::from_levels(
        "XBTUSD",
        &[(99.5, 3.0), (99.0, 5.0)],
        &[(100.5, 3.0), (101.0, 5.0)],
        Utc::now(),
    );
    connector.publish_market_data(book).await.unwrap();

    let outcome = exec.submit_order(&order(9, Side::Buy, 100.5, 2.0)).await;
    assert!(outcome.is_submitted());

    let report = executions.recv().await.unwrap();
    assert_eq!(report.order_id, 9);
    assert_eq!(report.status, OrderStatus::Filled);
    assert_eq!(report.filled_quantity, 2.0);
    assert_eq!(connector.get_current_position().await, Ok(2.0));
}
