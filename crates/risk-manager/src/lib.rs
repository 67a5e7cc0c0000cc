//! Kestrel Risk Manager
//!
//! Global, cross-order risk gating for a trading session:
//!
//! - **Pre-trade checks**: order value, message rate, adverse selection
//! - **Session metrics**: cash-flow P&L, drawdown, mid-price history, VaR
//! - **Stress test**: `|position_value| * VaR * multiplier` against a limit
//! - **Circuit breaker**: halts the session; only an explicit reset re-arms it
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Risk Manager                          │
//! │                                                             │
//! │  Order + Depth ───► check_order_risk ───► Pass / Reject     │
//! │                          ▲                                  │
//! │                          │ fails closed when Triggered      │
//! │                          │                                  │
//! │  Fill + Depth ───► update_metrics ──► VaR ──► stress test   │
//! │                          │                        │         │
//! │                          ▼                        ▼         │
//! │                  check_circuit_breakers ──► CircuitBreaker  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                  snapshot() (lock-free telemetry)
//! ```

pub mod breaker;
pub mod check;
pub mod limits;
pub mod manager;
pub mod metrics;
pub mod var;

// Re-export main types
pub use breaker::{BreakerState, CircuitBreaker, TripReason, TripRecord};
pub use check::{RiskCheck, RiskRejection};
pub use limits::{BreakerConfig, RiskLimits};
pub use manager::RiskManager;
pub use metrics::{RiskSnapshot, adverse_selection};
pub use var::{historical_var, log_returns};
