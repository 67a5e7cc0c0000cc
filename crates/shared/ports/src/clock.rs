use kestrel_core::Timestamp;

/// Source of "now" for every component that stamps or windows by time.
///
/// Live sessions read the wall clock. Backtests read a replay clock that the
/// replay loop moves to each snapshot's timestamp, so message-rate windows
/// and breaker trip times are reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Identifier for logs
    fn name(&self) -> &str {
        "clock"
    }
}
