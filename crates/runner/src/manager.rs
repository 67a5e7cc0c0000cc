//! Strategy Manager
//!
//! Runs one [`SymbolSession`] per symbol, each on its own tokio task fed by
//! an mpsc queue. Events for a symbol are handled strictly in arrival order;
//! different symbols proceed in parallel on the runtime's worker threads.
//!
//! ```text
//!                    ┌──────── DashMap<symbol, handle> ────────┐
//!  dispatch_market_data ─► health gate ─► mpsc ─► task(XBTUSD) │
//!  dispatch_execution  ───────────────► mpsc ─► task(ETHUSD)   │
//!                    └─────────────────────────────────────────┘
//! ```

use crate::config::HealthConfig;
use crate::error::RunnerError;
use crate::health::{HealthStatus, SymbolHealth};
use crate::session::{SessionSummary, SymbolSession};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kestrel_core::MarketDepth;
use kestrel_ports::{Clock, ExecutionReport};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pending events per symbol before dispatch waits
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    MarketData(MarketDepth),
    Execution(ExecutionReport),
    Shutdown,
}

struct SymbolHandle {
    tx: mpsc::Sender<SessionEvent>,
    health: Arc<Mutex<SymbolHealth>>,
    task: JoinHandle<SessionSummary>,
}

pub struct StrategyManager {
    sessions: DashMap<String, SymbolHandle>,
    health_config: HealthConfig,
    clock: Arc<dyn Clock>,
    queue_capacity: usize,
}

impl StrategyManager {
    pub fn new(health_config: HealthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            health_config,
            clock,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Start a task for the session. Must be called inside a tokio runtime.
    pub fn add_symbol(&self, session: SymbolSession) -> Result<(), RunnerError> {
        let symbol = session.symbol().to_string();
        match self.sessions.entry(symbol.clone()) {
            Entry::Occupied(_) => Err(RunnerError::DuplicateSymbol(symbol)),
            Entry::Vacant(slot) => {
                let (tx, rx) = mpsc::channel(self.queue_capacity);
                let health = Arc::new(Mutex::new(SymbolHealth::new(
                    symbol.clone(),
                    self.health_config.clone(),
                )));
                let task = tokio::spawn(run_session(
                    session,
                    rx,
                    health.clone(),
                    self.clock.clone(),
                ));
                slot.insert(SymbolHandle { tx, health, task });
                info!("[SESSION] {} started", symbol);
                Ok(())
            }
        }
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    /// Queue a snapshot for its symbol's session.
    ///
    /// Returns `Ok(false)` when the symbol is not healthy and the snapshot
    /// was dropped.
    pub async fn dispatch_market_data(&self, depth: MarketDepth) -> Result<bool, RunnerError> {
        let (tx, health) = self.handle_parts(&depth.symbol)?;
        if !health.lock().can_trade(self.clock.now()) {
            debug!("[SESSION] {} unhealthy, snapshot dropped", depth.symbol);
            return Ok(false);
        }
        let symbol = depth.symbol.clone();
        tx.send(SessionEvent::MarketData(depth))
            .await
            .map_err(|_| RunnerError::SessionClosed(symbol))?;
        Ok(true)
    }

    /// Queue an execution report. Reports are delivered whatever the health.
    pub async fn dispatch_execution(
        &self,
        symbol: &str,
        report: ExecutionReport,
    ) -> Result<(), RunnerError> {
        let (tx, _) = self.handle_parts(symbol)?;
        tx.send(SessionEvent::Execution(report))
            .await
            .map_err(|_| RunnerError::SessionClosed(symbol.to_string()))
    }

    pub fn health(&self, symbol: &str) -> Option<HealthStatus> {
        self.sessions
            .get(symbol)
            .map(|h| h.health.lock().status().clone())
    }

    /// Put a deactivated or degraded symbol back into service
    pub fn reactivate(&self, symbol: &str) -> Result<(), RunnerError> {
        let handle = self
            .sessions
            .get(symbol)
            .ok_or_else(|| RunnerError::UnknownSymbol(symbol.to_string()))?;
        handle.health.lock().reactivate();
        Ok(())
    }

    /// Stop every session after its queued events, returning their summaries
    /// in symbol order
    pub async fn shutdown(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for symbol in self.symbols() {
            let Some((_, handle)) = self.sessions.remove(&symbol) else {
                continue;
            };
            // A closed queue means the task already ended; join it anyway
            let _ = handle.tx.send(SessionEvent::Shutdown).await;
            match handle.task.await {
                Ok(summary) => summaries.push(summary),
                Err(e) => error!("[SESSION] {} task failed: {}", symbol, e),
            }
        }
        summaries
    }

    // Clone out of the map so no shard lock is held across an await
    fn handle_parts(
        &self,
        symbol: &str,
    ) -> Result<(mpsc::Sender<SessionEvent>, Arc<Mutex<SymbolHealth>>), RunnerError> {
        self.sessions
            .get(symbol)
            .map(|h| (h.tx.clone(), h.health.clone()))
            .ok_or_else(|| RunnerError::UnknownSymbol(symbol.to_string()))
    }
}

async fn run_session(
    mut session: SymbolSession,
    mut rx: mpsc::Receiver<SessionEvent>,
    health: Arc<Mutex<SymbolHealth>>,
    clock: Arc<dyn Clock>,
) -> SessionSummary {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::MarketData(depth) => {
                // Events queued before a suspension are not quoted on
                if !health.lock().can_trade(clock.now()) {
                    session.observe(depth);
                    continue;
                }

                let report = session.on_market_data(depth).await;
                let pull_quotes = {
                    let mut h = health.lock();
                    let now = clock.now();
                    if report.connectivity_lost {
                        h.deactivate("connectivity lost");
                    } else if report.failures > 0 {
                        for _ in 0..report.failures {
                            h.record_error(now);
                        }
                    } else {
                        h.record_success(now);
                    }
                    !h.status().is_healthy()
                };
                if pull_quotes {
                    let cancelled = session.cancel_all().await;
                    warn!(
                        "[SESSION] {} suspended, {} working orders cancelled",
                        session.symbol(),
                        cancelled
                    );
                }
            }
            SessionEvent::Execution(report) => {
                if let Err(e) = session.on_execution(&report) {
                    warn!("[SESSION] {} execution report dropped: {}", session.symbol(), e);
                    health.lock().record_error(clock.now());
                }
            }
            SessionEvent::Shutdown => break,
        }
    }
    session.shutdown().await
}
