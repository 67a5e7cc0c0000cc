mod buffer;
mod depth;

pub use buffer::{DEFAULT_BUFFER_CAPACITY, MarketDataBuffer};
pub use depth::{DepthLevel, MAX_LEVELS, MarketDepth};
