//! In-memory exchange connector
//!
//! Records every order operation, answers position and leverage queries from
//! settable values and can be scripted to fail. With auto-fill enabled, an
//! order that crosses the last published book is filled in full at its limit
//! price and an execution report is pushed on the execution stream.

use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use kestrel_core::{MarketDepth, Order, OrderId, OrderStatus, Side};
use kestrel_ports::{ConnectorError, ConnectorResult, ExchangeConnector, ExecutionReport};
use log::debug;
use parking_lot::Mutex;
use tokio::sync::mpsc;

const FEED_CAPACITY: usize = 1024;

struct SimState {
    position: f64,
    leverage: f64,
    submissions: Vec<Order>,
    cancels: Vec<OrderId>,
    amendments: Vec<Order>,
    last_depth: Option<MarketDepth>,
    query_error: Option<ConnectorError>,
    pending_failures: u32,
    failure: ConnectorError,
    pending_declines: u32,
    order_calls: u32,
}

impl SimState {
    /// Scripted outcome for the next order operation, if any
    fn scripted(&mut self) -> Option<ConnectorResult<bool>> {
        self.order_calls += 1;
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return Some(Err(self.failure.clone()));
        }
        if self.pending_declines > 0 {
            self.pending_declines -= 1;
            return Some(Ok(false));
        }
        None
    }
}

pub struct SimulatedConnector {
    name: String,
    auto_fill: bool,
    state: Mutex<SimState>,
    md_tx: Mutex<Option<mpsc::Sender<MarketDepth>>>,
    exec_tx: Mutex<Option<mpsc::Sender<ExecutionReport>>>,
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedConnector {
    pub fn new() -> Self {
        Self {
            name: "simulated".to_string(),
            auto_fill: false,
            state: Mutex::new(SimState {
                position: 0.0,
                leverage: 1.0,
                submissions: Vec::new(),
                cancels: Vec::new(),
                amendments: Vec::new(),
                last_depth: None,
                query_error: None,
                pending_failures: 0,
                failure: ConnectorError::Timeout,
                pending_declines: 0,
                order_calls: 0,
            }),
            md_tx: Mutex::new(None),
            exec_tx: Mutex::new(None),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fill crossing orders against the last published book
    pub fn with_auto_fill(mut self) -> Self {
        self.auto_fill = true;
        self
    }

    pub fn set_position(&self, position: f64) {
        self.state.lock().position = position;
    }

    pub fn set_leverage(&self, leverage: f64) {
        self.state.lock().leverage = leverage;
    }

    /// Make position and leverage queries fail while set
    pub fn set_query_error(&self, error: Option<ConnectorError>) {
        self.state.lock().query_error = error;
    }

    /// Fail the next `n` order operations with a timeout
    pub fn fail_next(&self, n: u32) {
        self.fail_next_with(n, ConnectorError::Timeout);
    }

    pub fn fail_next_with(&self, n: u32, error: ConnectorError) {
        let mut state = self.state.lock();
        state.pending_failures = n;
        state.failure = error;
    }

    /// Answer `Ok(false)` to the next `n` order operations
    pub fn decline_next(&self, n: u32) {
        self.state.lock().pending_declines = n;
    }

    pub fn submissions(&self) -> Vec<Order> {
        self.state.lock().submissions.clone()
    }

    pub fn cancels(&self) -> Vec<OrderId> {
        self.state.lock().cancels.clone()
    }

    pub fn amendments(&self) -> Vec<Order> {
        self.state.lock().amendments.clone()
    }

    /// Order operations attempted, including scripted failures
    pub fn order_calls(&self) -> u32 {
        self.state.lock().order_calls
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    /// Push a book snapshot to the market data subscriber.
    ///
    /// The snapshot is kept for auto-fill even with no subscriber.
    pub async fn publish_market_data(&self, depth: MarketDepth) -> Result<()> {
        self.state.lock().last_depth = Some(depth.clone());
        let tx = self.md_tx.lock().clone();
        match tx {
            Some(tx) => tx.send(depth).await.map_err(|_| GatewayError::ChannelClosed),
            None => Ok(()),
        }
    }

    pub async fn publish_execution(&self, report: ExecutionReport) -> Result<()> {
        let tx = self.exec_tx.lock().clone();
        match tx {
            Some(tx) => tx.send(report).await.map_err(|_| GatewayError::ChannelClosed),
            None => Ok(()),
        }
    }

    fn crossing_fill(state: &mut SimState, order: &Order) -> Option<ExecutionReport> {
        let depth = state.last_depth.as_ref()?;
        let crosses = match order.side {
            Side::Buy => depth.best_ask().is_some_and(|ask| ask <= order.price),
            Side::Sell => depth.best_bid().is_some_and(|bid| bid >= order.price),
        };
        if !crosses {
            return None;
        }
        let timestamp = depth.last_update;
        state.position += order.side.signed(order.remaining_quantity());
        Some(ExecutionReport {
            order_id: order.id,
            status: OrderStatus::Filled,
            price: order.price,
            filled_quantity: order.quantity,
            timestamp,
        })
    }
}

#[async_trait]
impl ExchangeConnector for SimulatedConnector {
    async fn place_order(&self, order: &Order) -> ConnectorResult<bool> {
        let report = {
            let mut state = self.state.lock();
            if let Some(outcome) = state.scripted() {
                return outcome;
            }
            state.submissions.push(order.clone());
            if self.auto_fill {
                Self::crossing_fill(&mut state, order)
            } else {
                None
            }
        };

        if let Some(report) = report {
            debug!("[SIM] Order {} filled on arrival", order.id);
            if self.publish_execution(report).await.is_err() {
                debug!("[SIM] Execution subscriber gone");
            }
        }
        Ok(true)
    }

    async fn cancel_order(&self, order_id: OrderId) -> ConnectorResult<bool> {
        let mut state = self.state.lock();
        if let Some(outcome) = state.scripted() {
            return outcome;
        }
        state.cancels.push(order_id);
        Ok(true)
    }

    async fn amend_order(&self, order: &Order) -> ConnectorResult<bool> {
        let mut state = self.state.lock();
        if let Some(outcome) = state.scripted() {
            return outcome;
        }
        state.amendments.push(order.clone());
        Ok(true)
    }

    async fn get_current_position(&self) -> ConnectorResult<f64> {
        let state = self.state.lock();
        match &state.query_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.position),
        }
    }

    async fn get_current_leverage(&self) -> ConnectorResult<f64> {
        let state = self.state.lock();
        match &state.query_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.leverage),
        }
    }

    fn subscribe_market_data(&self) -> mpsc::Receiver<MarketDepth> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        *self.md_tx.lock() = Some(tx);
        rx
    }

    fn subscribe_executions(&self) -> mpsc::Receiver<ExecutionReport> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        *self.exec_tx.lock() = Some(tx);
        rx
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book() -> MarketDepth {
        MarketDepth::from_levels("XBTUSD", &[(99.0, 5.0)], &[(101.0, 5.0)], Utc::now())
    }

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let sim = SimulatedConnector::new();
        sim.fail_next_with(1, ConnectorError::RateLimitExceeded);
        sim.decline_next(1);
        let order = Order::new_with_time(1, "XBTUSD", Side::Buy, 100.0, 1.0, Utc::now());

        assert_eq!(
            sim.place_order(&order).await,
            Err(ConnectorError::RateLimitExceeded)
        );
        assert_eq!(sim.place_order(&order).await, Ok(false));
        assert_eq!(sim.place_order(&order).await, Ok(true));
        assert_eq!(sim.order_calls(), 3);
        assert_eq!(sim.submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_auto_fill_on_cross() {
        let sim = SimulatedConnector::new().with_auto_fill();
        let mut executions = sim.subscribe_executions();
        sim.publish_market_data(book()).await.unwrap();

        let passive = Order::new_with_time(1, "XBTUSD", Side::Buy, 100.0, 1.0, Utc::now());
        sim.place_order(&passive).await.unwrap();
        assert!(executions.try_recv().is_err());

        let crossing = Order::new_with_time(2, "XBTUSD", Side::Sell, 98.5, 2.0, Utc::now());
        sim.place_order(&crossing).await.unwrap();
        let report = executions.recv().await.unwrap();
        assert_eq!(report.order_id, 2);
        assert_eq!(report.status, OrderStatus::Filled);
        assert_eq!(sim.position(), -2.0);
    }

    #[tokio::test]
    async fn test_market_data_stream() {
        let sim = SimulatedConnector::new();
        let mut feed = sim.subscribe_market_data();
        sim.publish_market_data(book()).await.unwrap();
        assert_eq!(feed.recv().await.unwrap().best_bid(), Some(99.0));

        drop(feed);
        assert_eq!(
            sim.publish_market_data(book()).await,
            Err(GatewayError::ChannelClosed)
        );
    }
}
