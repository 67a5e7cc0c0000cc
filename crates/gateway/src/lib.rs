//! Kestrel Gateway
//!
//! Execution layer between the trading core and an exchange connection:
//! - Pre-trade checks against venue position and leverage
//! - Bounded retries with a fixed delay for transient connector faults
//! - An in-memory [`SimulatedConnector`] for tests and dry runs
//!
//! ## Architecture
//!
//! ```text
//!   Strategy / Session
//!         │ Order
//!   ┌─────▼────────────┐
//!   │ ExecutionManager │  pre-trade ─► retry loop
//!   └─────┬────────────┘
//!         │ Arc<dyn ExchangeConnector>
//!   ┌─────▼────────────┐
//!   │ Venue adapter    │  (SimulatedConnector, ...)
//!   └──────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod execution;

pub use adapters::SimulatedConnector;
pub use config::ExecutionConfig;
pub use error::{GatewayError, Result};
pub use execution::{ExecutionManager, ExecutionStats, PreTradeViolation, SubmitOutcome};
