use chrono::{DateTime, Duration, Utc};
use kestrel_core::Timestamp;
use kestrel_ports::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Clock driven by replayed data rather than wall time.
///
/// The backtest engine moves it to each snapshot's timestamp before any
/// component reads it, so every timestamp and rate computed during a run is
/// a function of the input data only.
pub struct ReplayClock {
    /// Current time in nanoseconds since the Unix epoch
    nanos: AtomicI64,
}

impl ReplayClock {
    /// Create a replay clock positioned at `initial_time`
    pub fn new(initial_time: Timestamp) -> Arc<Self> {
        Arc::new(Self {
            nanos: AtomicI64::new(initial_time.timestamp_nanos_opt().unwrap_or_default()),
        })
    }

    /// Jump to `time`. Moving backwards is allowed; callers enforce ordering.
    pub fn set(&self, time: Timestamp) {
        self.nanos
            .store(time.timestamp_nanos_opt().unwrap_or_default(), Ordering::Release);
    }

    /// Advance by `delta`
    pub fn advance(&self, delta: Duration) {
        let step = delta.num_nanoseconds().unwrap_or_default();
        self.nanos.fetch_add(step, Ordering::AcqRel);
    }
}

impl Clock for ReplayClock {
    fn now(&self) -> Timestamp {
        DateTime::<Utc>::from_timestamp_nanos(self.nanos.load(Ordering::Acquire))
    }

    fn name(&self) -> &str {
        "ReplayClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_replay_clock_only_moves_when_told() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let clock = ReplayClock::new(start);
        assert_eq!(clock.now(), start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));

        let later = start + Duration::minutes(10);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
