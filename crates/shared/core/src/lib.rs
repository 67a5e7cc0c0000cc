//! Kestrel Core Domain
//!
//! Pure domain types for the Kestrel market-making engine.
//! This crate contains no async, no I/O, and is 100% unit testable.
//!
//! - [`Order`] / [`OrderStatus`] / [`Side`]: order lifecycle records
//! - [`MarketDepth`]: fixed-capacity book snapshot, best level first
//! - [`AtomicF64`]: lock-free scalar used for position and risk telemetry

pub mod atomic;
pub mod entities;
pub mod market;
pub mod values;

// Re-export commonly used types at crate root
pub use atomic::AtomicF64;
pub use entities::{Fill, Order, OrderId, OrderStatus, Side};
pub use market::{DEFAULT_BUFFER_CAPACITY, DepthLevel, MAX_LEVELS, MarketDataBuffer, MarketDepth};
pub use values::{Price, Quantity, Symbol, Timestamp};
