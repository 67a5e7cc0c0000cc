//! Kestrel Clock Infrastructure
//!
//! Time sources behind the [`Clock`] port:
//!
//! - [`SystemClock`]: wall-clock time for live sessions
//! - [`ReplayClock`]: data-driven time for backtests; it only moves when the
//!   replay loop sets it, which keeps runs reproducible
//!
//! ## Usage
//!
//! ```ignore
//! use kestrel_clock::{Clock, ReplayClock};
//!
//! let clock = ReplayClock::new(first_snapshot.last_update);
//! for depth in &snapshots {
//!     clock.set(depth.last_update);
//!     // ... components read clock.now()
//! }
//! ```

mod replay;
mod system;

pub use replay::ReplayClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use kestrel_ports::Clock;
