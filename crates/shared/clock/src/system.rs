use chrono::Utc;
use kestrel_core::Timestamp;
use kestrel_ports::Clock;

/// Wall-clock time for live sessions.
///
/// Risk windows, breaker trip times and order timestamps all follow the
/// machine clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "system"
    }
}
