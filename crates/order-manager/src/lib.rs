//! Kestrel Order Manager
//!
//! Sole authority over order identity, lifecycle and the position derived
//! from fills:
//! - **Placement**: fresh monotonically increasing ids, local limit checks
//! - **Lifecycle**: `New → PartiallyFilled → Filled | Cancelled | Rejected`
//! - **Accounting**: signed position and notional exposure from fill deltas
//!
//! ## Architecture
//!
//! ```text
//! Strategy ──► place_order ──► ┌──────────────────────────────────┐
//!                              │          Order Manager           │
//!                              │  ┌────────────────────────────┐  │
//!                              │  │ Local limits               │  │
//!                              │  │  - max_order_size          │  │
//!                              │  │  - max_position / notional │  │
//!                              │  │  - max_active_orders       │  │
//!                              │  └─────────────┬──────────────┘  │
//!                              │                │ New             │
//!                              │  ┌─────────────▼──────────────┐  │
//!                              │  │ Order table (RwLock)       │  │
//!                              │  └─────────────┬──────────────┘  │
//!                              │                │ fill deltas     │
//!                              │  ┌─────────────▼──────────────┐  │
//!                              │  │ position / notional        │  │
//!                              │  │ (atomics, acquire/release) │  │
//!                              │  └────────────────────────────┘  │
//!                              └──────────────────────────────────┘
//!                                               ▲
//! Exchange / Backtest ──► update_order ─────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kestrel_order_manager::{OrderManager, OrderManagerConfig};
//!
//! let om = OrderManager::new(OrderManagerConfig::default(), clock);
//! if let Some(order) = om.place_order(Side::Buy, 99.5, 1.0) {
//!     // route to the venue, later:
//!     om.update_order(&order.with_fill(1.0, now))?;
//! }
//! ```

pub mod config;
pub mod error;
pub mod manager;

// Re-export main types
pub use config::OrderManagerConfig;
pub use error::{PlacementRejection, Result, UpdateError};
pub use kestrel_core::Fill;
pub use manager::OrderManager;
