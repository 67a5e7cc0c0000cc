//! Kestrel Runner
//!
//! Wires the trading core into something that runs:
//! - [`EngineConfig`]: JSON config with `KESTREL_*` environment overrides
//! - [`SymbolSession`]: one symbol's Strategy → OM → RM → execution chain
//! - [`StrategyManager`]: per-symbol tasks with health tracking
//! - [`stoikov_backtest`]: the same chain replayed over recorded snapshots
//!
//! ## Architecture
//!
//! ```text
//!   ExchangeConnector ──► market data ──┐
//!          ▲                            ▼
//!          │                    ┌───────────────┐
//!          │   orders/cancels   │StrategyManager│── health per symbol
//!          └────────────────────┤  task/symbol  │
//!                               └───────────────┘
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod manager;
pub mod session;

pub use config::{EngineConfig, HealthConfig, SymbolConfig};
pub use error::{ConfigError, RunnerError};
pub use health::{HealthStatus, SymbolHealth};
pub use logging::init_logging;
pub use manager::{SessionEvent, StrategyManager};
pub use session::{SessionSummary, SymbolSession, TickReport};

use chrono::{DateTime, Utc};
use kestrel_backtest::{BacktestConfig, BacktestEngine};
use kestrel_clock::ReplayClock;
use kestrel_order_manager::OrderManager;
use kestrel_risk_manager::RiskManager;
use kestrel_strategy::StoikovStrategy;
use std::sync::Arc;

/// Build a backtest of the Stoikov strategy with one symbol's settings.
///
/// The replay clock starts at `start`; the engine moves it per snapshot.
pub fn stoikov_backtest(
    symbol: &SymbolConfig,
    config: BacktestConfig,
    start: DateTime<Utc>,
) -> BacktestEngine<StoikovStrategy> {
    let clock = ReplayClock::new(start);
    let om = Arc::new(OrderManager::new(symbol.order_manager.clone(), clock.clone()));
    let rm = Arc::new(RiskManager::new(symbol.risk.clone(), clock.clone()));
    let strategy = StoikovStrategy::new(symbol.strategy.clone(), om.clone(), rm.clone());
    BacktestEngine::new(config, strategy, om, rm, clock)
}
