//! One symbol's live trading chain
//!
//! ```text
//!   MarketDepth ─► Strategy ─► Action::Submit ─► RiskManager ─► ExecutionManager ─► venue
//!                         └──► Action::Cancel ─────────────────► ExecutionManager ─► venue
//!
//!   ExecutionReport ─► OrderManager::update_order ─► Fill ─► RiskManager::update_metrics
//! ```
//!
//! A session is driven by exactly one task, so one tick's chain finishes
//! before the next event is looked at.

use crate::config::SymbolConfig;
use kestrel_core::{Fill, MarketDataBuffer, MarketDepth, Order, OrderId, Side};
use kestrel_gateway::{ExecutionManager, SubmitOutcome};
use kestrel_order_manager::{OrderManager, Result as UpdateResult};
use kestrel_ports::{Clock, ExchangeConnector, ExecutionReport};
use kestrel_risk_manager::{RiskCheck, RiskManager, RiskSnapshot};
use kestrel_strategy::{Action, StoikovStrategy, Strategy};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Snapshots kept for marking fills
const BUFFER_CAPACITY: usize = 256;

/// What one market data tick led to
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub submitted: u32,
    /// Refused by the risk manager or the pre-trade checks
    pub rejected: u32,
    /// Submissions or cancels that ran out of retries
    pub failures: u32,
    pub cancelled: u32,
    pub connectivity_lost: bool,
}

/// Final counters of a stopped session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub symbol: String,
    pub ticks: u64,
    pub submitted: u64,
    pub rejected: u64,
    pub failures: u64,
    pub fills: u64,
    pub protocol_violations: u64,
    pub position: f64,
    pub risk: RiskSnapshot,
}

pub struct SymbolSession {
    symbol: String,
    strategy: Box<dyn Strategy>,
    order_manager: Arc<OrderManager>,
    risk_manager: Arc<RiskManager>,
    execution: ExecutionManager,
    buffer: MarketDataBuffer,
    ticks: u64,
    submitted: u64,
    rejected: u64,
    failures: u64,
    fills: u64,
}

impl SymbolSession {
    /// Wire a Stoikov session for one configured symbol
    pub fn stoikov(
        config: &SymbolConfig,
        connector: Arc<dyn ExchangeConnector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let order_manager = Arc::new(OrderManager::new(
            config.order_manager.clone(),
            clock.clone(),
        ));
        let risk_manager = Arc::new(RiskManager::new(config.risk.clone(), clock));
        let strategy = StoikovStrategy::new(
            config.strategy.clone(),
            order_manager.clone(),
            risk_manager.clone(),
        );
        let execution = ExecutionManager::new(config.execution.clone(), connector);
        Self::new(Box::new(strategy), order_manager, risk_manager, execution)
    }

    pub fn new(
        strategy: Box<dyn Strategy>,
        order_manager: Arc<OrderManager>,
        risk_manager: Arc<RiskManager>,
        execution: ExecutionManager,
    ) -> Self {
        let symbol = order_manager.config().symbol.clone();
        info!(
            "[SESSION] {} ready: strategy={}, venue={}",
            symbol,
            strategy.name(),
            execution.connector().name()
        );
        Self {
            symbol,
            strategy,
            order_manager,
            risk_manager,
            execution,
            buffer: MarketDataBuffer::new(BUFFER_CAPACITY),
            ticks: 0,
            submitted: 0,
            rejected: 0,
            failures: 0,
            fills: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn order_manager(&self) -> &Arc<OrderManager> {
        &self.order_manager
    }

    pub fn risk_manager(&self) -> &Arc<RiskManager> {
        &self.risk_manager
    }

    pub fn execution(&self) -> &ExecutionManager {
        &self.execution
    }

    /// Remember a snapshot without quoting on it
    pub fn observe(&mut self, depth: MarketDepth) {
        self.buffer.push(depth);
    }

    fn router(&self) -> Router<'_> {
        Router {
            symbol: &self.symbol,
            order_manager: &self.order_manager,
            risk_manager: &self.risk_manager,
            execution: &self.execution,
        }
    }

    /// Run the strategy on a snapshot and route what it asks for
    pub async fn on_market_data(&mut self, depth: MarketDepth) -> TickReport {
        self.ticks += 1;
        let actions = self.strategy.on_market_data(&depth);
        let mut report = TickReport::default();

        let router = self.router();
        for action in actions {
            match action {
                Action::Submit(order) if report.connectivity_lost => {
                    router.order_manager.reject_order(order.id);
                    report.rejected += 1;
                }
                Action::Submit(order) => router.route(&order, &depth, &mut report).await,
                Action::Cancel(id) => router.cancel(id, &mut report).await,
            }
        }

        self.submitted += u64::from(report.submitted);
        self.rejected += u64::from(report.rejected);
        self.failures += u64::from(report.failures);
        self.buffer.push(depth);
        report
    }

    /// Apply a venue execution report to the order table and risk state
    pub fn on_execution(&mut self, report: &ExecutionReport) -> UpdateResult<Option<Fill>> {
        let order = self.order_manager.get_order(report.order_id).unwrap_or_else(|| {
            // The table classifies orders it no longer tracks by id alone
            Order::new_with_time(
                report.order_id,
                self.symbol.clone(),
                Side::Buy,
                report.price,
                report.filled_quantity,
                report.timestamp,
            )
        });

        let fill = self.order_manager.update_order(&report.apply_to(&order))?;
        if let Some(fill) = &fill {
            let depth = self
                .buffer
                .latest()
                .cloned()
                .unwrap_or_else(|| MarketDepth::new(self.symbol.clone(), report.timestamp));
            self.risk_manager.update_metrics(fill, &depth);
            self.fills += 1;
        }
        Ok(fill)
    }

    /// Cancel every working order locally and at the venue
    pub async fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for id in self.order_manager.cancel_all() {
            if self.execution.cancel_order(id).await {
                cancelled += 1;
            }
        }
        cancelled
    }

    /// Pull quotes and report the session's counters
    pub async fn shutdown(mut self) -> SessionSummary {
        let actions = self.strategy.on_shutdown();
        let mut report = TickReport::default();
        let router = self.router();
        for action in actions {
            if let Action::Cancel(id) = action {
                router.cancel(id, &mut report).await;
            }
        }
        self.cancel_all().await;
        let summary = self.summary();
        info!(
            "[SESSION] {} stopped: ticks={}, submitted={}, fills={}, position={}",
            summary.symbol, summary.ticks, summary.submitted, summary.fills, summary.position
        );
        summary
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            symbol: self.symbol.clone(),
            ticks: self.ticks,
            submitted: self.submitted,
            rejected: self.rejected,
            failures: self.failures,
            fills: self.fills,
            protocol_violations: self.order_manager.protocol_violations(),
            position: self.order_manager.position(),
            risk: self.risk_manager.snapshot(),
        }
    }
}

/// Borrowed routing half of a session; it holds only the shareable parts
struct Router<'a> {
    symbol: &'a str,
    order_manager: &'a OrderManager,
    risk_manager: &'a RiskManager,
    execution: &'a ExecutionManager,
}

impl Router<'_> {
    async fn route(&self, order: &Order, depth: &MarketDepth, report: &mut TickReport) {
        if let RiskCheck::Reject(reason) = self.risk_manager.check_order_risk(order, depth) {
            debug!("[SESSION] {} order {} refused: {}", self.symbol, order.id, reason);
            self.order_manager.reject_order(order.id);
            report.rejected += 1;
            return;
        }

        match self.execution.submit_order(order).await {
            SubmitOutcome::Submitted { .. } => report.submitted += 1,
            SubmitOutcome::Rejected(_) => {
                self.order_manager.reject_order(order.id);
                report.rejected += 1;
            }
            outcome @ SubmitOutcome::Exhausted { .. } => {
                self.order_manager.reject_order(order.id);
                report.failures += 1;
                if outcome.lost_connectivity() {
                    report.connectivity_lost = true;
                }
            }
        }
    }

    async fn cancel(&self, id: OrderId, report: &mut TickReport) {
        if self.execution.cancel_order(id).await {
            report.cancelled += 1;
        } else {
            warn!("[SESSION] {} cancel of order {} not confirmed", self.symbol, id);
            report.failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kestrel_clock::SystemClock;
    use kestrel_core::OrderStatus;
    use kestrel_gateway::SimulatedConnector;
    use kestrel_order_manager::UpdateError;

    fn book(mid: f64) -> MarketDepth {
        MarketDepth::from_levels(
            "XBTUSD",
            &[(mid - 0.05, 10.0)],
            &[(mid + 0.05, 10.0)],
            Utc::now(),
        )
    }

    fn session(sim: Arc<SimulatedConnector>) -> SymbolSession {
        let mut config = SymbolConfig::default();
        config.execution.retry_delay_ms = 0;
        SymbolSession::stoikov(&config, sim, Arc::new(SystemClock::new()))
    }

    #[tokio::test]
    async fn test_tick_submits_two_sided_quotes() {
        let sim = Arc::new(SimulatedConnector::new());
        let mut session = session(sim.clone());

        let report = session.on_market_data(book(100.0)).await;
        assert_eq!(report.submitted, 2);
        assert_eq!(sim.submissions().len(), 2);
        assert_eq!(session.order_manager().active_order_count(), 2);

        // Stale quotes are pulled before requoting
        let report = session.on_market_data(book(100.0)).await;
        assert_eq!(report.cancelled, 2);
        assert_eq!(report.submitted, 2);
        assert_eq!(sim.cancels().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_submission_is_rejected_locally() {
        let sim = Arc::new(SimulatedConnector::new());
        let mut session = session(sim.clone());
        sim.fail_next(100);

        let report = session.on_market_data(book(100.0)).await;
        assert_eq!(report.submitted, 0);
        assert_eq!(report.failures, 2);
        assert!(!report.connectivity_lost);
        assert_eq!(session.order_manager().active_order_count(), 0);
    }

    #[tokio::test]
    async fn test_execution_report_updates_position_and_risk() {
        let sim = Arc::new(SimulatedConnector::new());
        let mut session = session(sim.clone());
        session.on_market_data(book(100.0)).await;

        let bid = sim.submissions()[0].clone();
        let report = ExecutionReport {
            order_id: bid.id,
            status: OrderStatus::Filled,
            price: bid.price,
            filled_quantity: bid.quantity,
            timestamp: Utc::now(),
        };
        let fill = session.on_execution(&report).unwrap().unwrap();
        assert_eq!(fill.quantity, bid.quantity);
        assert_eq!(session.order_manager().position(), bid.quantity);
        assert_eq!(session.risk_manager().snapshot().position, bid.quantity);

        // A repeat report for a finished order is a protocol violation
        assert!(matches!(
            session.on_execution(&report),
            Err(UpdateError::TerminalOrder { .. })
        ));
        assert_eq!(session.summary().protocol_violations, 1);
    }

    #[tokio::test]
    async fn test_late_and_unknown_reports_are_counted() {
        let sim = Arc::new(SimulatedConnector::new());
        let mut session = session(sim.clone());
        session.on_market_data(book(100.0)).await;

        let bid = sim.submissions()[0].clone();
        assert!(session.order_manager().cancel_order(bid.id));

        // Fill racing the cancel
        let late = ExecutionReport {
            order_id: bid.id,
            status: OrderStatus::Filled,
            price: bid.price,
            filled_quantity: bid.quantity,
            timestamp: Utc::now(),
        };
        assert!(matches!(
            session.on_execution(&late),
            Err(UpdateError::TerminalOrder {
                status: OrderStatus::Cancelled,
                ..
            })
        ));

        let unknown = ExecutionReport {
            order_id: 9_999,
            ..late.clone()
        };
        assert!(matches!(
            session.on_execution(&unknown),
            Err(UpdateError::UnknownOrder(9_999))
        ));

        let summary = session.summary();
        assert_eq!(summary.protocol_violations, 2);
        assert_eq!(summary.fills, 0);
        assert_eq!(summary.position, 0.0);
    }
}
