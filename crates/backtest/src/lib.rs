//! Kestrel Backtest
//!
//! Deterministic replay of the quoting loop over recorded order book
//! snapshots, with transaction costs, liquidity-scaled slippage and a
//! pluggable fill model.
//!
//! ## Architecture
//!
//! ```text
//!   JSONL / synthetic ──► Vec<MarketDepth>
//!                              │
//!                      ┌───────▼────────┐
//!                      │ BacktestEngine │── ReplayClock
//!                      └───────┬────────┘
//!          Strategy ─ OrderManager ─ RiskManager ─ FillModel
//!                              │
//!                      ┌───────▼────────┐
//!                      │BacktestResults │──► JSON / CSV
//!                      └────────────────┘
//! ```
//!
//! Warm-up bars only feed the strategy. Equity is cash plus position marked
//! at the mid, so a run without fills keeps its initial capital exactly.

pub mod analytics;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod fill_model;
pub mod performance;
pub mod results;
pub mod synthetic;

pub use analytics::{BookAnalytics, VPIN_BUCKET_SIZE};
pub use config::BacktestConfig;
pub use data::load_snapshots;
pub use engine::{BacktestEngine, ExecutionCosts};
pub use error::{BacktestError, Result};
pub use fill_model::{FillModel, ImmediateFill, TouchFill};
pub use performance::{PerformanceMetrics, PerformanceMonitor};
pub use results::{BacktestResults, BacktestSummary, TradeRecord};
