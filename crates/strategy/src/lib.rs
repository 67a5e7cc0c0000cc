//! Kestrel Strategy Framework
//!
//! Quoting logic for the market-making core:
//! - [`Strategy`] trait: one call per book snapshot, returning venue actions
//! - [`StoikovStrategy`]: inventory-aware optimal quoting
//! - [`VolatilityEstimator`]: rolling annualized volatility of mid returns
//!
//! ## Architecture
//!
//! ```text
//! MarketDepth ──► Strategy::on_market_data
//!                        │
//!                        ├── VolatilityEstimator (owned, sequential)
//!                        ├── OrderManager::position()
//!                        ├── RiskManager::is_halted()
//!                        │
//!                        ▼
//!                 compute_quote (pure)
//!                        │
//!                        ▼
//!             OrderManager::place_order ──► Vec<Action> ──► Execution / Backtest
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kestrel_strategy::{StoikovConfig, StoikovStrategy, Strategy};
//!
//! let mut strategy = StoikovStrategy::new(StoikovConfig::default(), om, rm);
//! for action in strategy.on_market_data(&depth) {
//!     // route Submit / Cancel
//! }
//! ```

pub mod stoikov;
pub mod strategy;
pub mod volatility;

// Re-export main types
pub use stoikov::{Quote, QuoteInputs, StoikovConfig, StoikovStrategy, compute_quote};
pub use strategy::{Action, Strategy};
pub use volatility::{ANNUALIZATION_DAYS, VolatilityEstimator};
