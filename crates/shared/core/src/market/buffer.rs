use std::collections::VecDeque;

use super::MarketDepth;

/// Default number of snapshots retained
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Bounded FIFO of recent depth snapshots; the oldest entry is evicted when full.
#[derive(Debug, Clone)]
pub struct MarketDataBuffer {
    capacity: usize,
    snapshots: VecDeque<MarketDepth>,
}

impl MarketDataBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            snapshots: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, depth: MarketDepth) {
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(depth);
    }

    /// Up to `n` most recent snapshots, oldest first
    pub fn recent(&self, n: usize) -> Vec<MarketDepth> {
        let skip = self.snapshots.len().saturating_sub(n);
        self.snapshots.iter().skip(skip).cloned().collect()
    }

    pub fn latest(&self) -> Option<&MarketDepth> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl Default for MarketDataBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_buffer_evicts_oldest() {
        let start = Utc::now();
        let mut buffer = MarketDataBuffer::new(3);
        for i in 0..5 {
            let px = 100.0 + i as f64;
            buffer.push(MarketDepth::from_levels(
                "XBTUSD",
                &[(px - 0.5, 1.0)],
                &[(px + 0.5, 1.0)],
                start + Duration::seconds(i),
            ));
        }
        assert_eq!(buffer.len(), 3);
        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].mid_price(), Some(103.0));
        assert_eq!(recent[1].mid_price(), Some(104.0));
        assert_eq!(buffer.recent(10).len(), 3);
    }
}
