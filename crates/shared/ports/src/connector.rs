use async_trait::async_trait;
use kestrel_core::{MarketDepth, Order, OrderId, OrderStatus, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::ConnectorResult;

/// Execution update pushed by the venue for one of our orders.
///
/// `filled_quantity` is cumulative, as venues report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub price: f64,
    pub filled_quantity: f64,
    pub timestamp: Timestamp,
}

impl ExecutionReport {
    /// Merge this report into the last known snapshot of the order
    pub fn apply_to(&self, order: &Order) -> Order {
        let mut next = order.clone();
        next.status = self.status;
        next.price = self.price;
        next.filled_quantity = self.filled_quantity;
        next.updated_at = self.timestamp;
        next
    }
}

/// Port for the exchange connection.
///
/// Implementations own their wire protocol, rate limiter and reconnect logic.
/// The engine only reacts to success flags, errors and the two streams.
#[async_trait]
pub trait ExchangeConnector: Send + Sync {
    /// Submit a new order; `Ok(false)` means the venue declined it
    async fn place_order(&self, order: &Order) -> ConnectorResult<bool>;

    async fn cancel_order(&self, order_id: OrderId) -> ConnectorResult<bool>;

    async fn amend_order(&self, order: &Order) -> ConnectorResult<bool>;

    /// Signed position currently held at the venue
    async fn get_current_position(&self) -> ConnectorResult<f64>;

    /// Account leverage as reported by the venue
    async fn get_current_leverage(&self) -> ConnectorResult<f64>;

    /// Stream of book snapshots
    fn subscribe_market_data(&self) -> mpsc::Receiver<MarketDepth>;

    /// Stream of execution reports for our orders
    fn subscribe_executions(&self) -> mpsc::Receiver<ExecutionReport>;

    fn name(&self) -> &str {
        "ExchangeConnector"
    }
}
