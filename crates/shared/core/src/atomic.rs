use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` cell with atomic load/store/add, stored as raw bits in an `AtomicU64`.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.bits.load(order))
    }

    pub fn store(&self, value: f64, order: Ordering) {
        self.bits.store(value.to_bits(), order);
    }

    /// Adds `delta` and returns the previous value.
    ///
    /// `order` applies to the successful exchange; the retry load is relaxed.
    pub fn fetch_add(&self, delta: f64, order: Ordering) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, order, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }

    /// Stores `max(current, value)` and returns the previous value
    pub fn fetch_max(&self, value: f64, order: Ordering) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let prev = f64::from_bits(current);
            if prev >= value {
                return prev;
            }
            match self
                .bits
                .compare_exchange_weak(current, value.to_bits(), order, Ordering::Relaxed)
            {
                Ok(_) => return prev,
                Err(actual) => current = actual,
            }
        }
    }
}
