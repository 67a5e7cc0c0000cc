//! Per-symbol health tracking
//!
//! ```text
//!            max_errors failures             recovery_delay elapsed
//!   Healthy ─────────────────────► Degraded ─────────────────────► Healthy
//!      │
//!      │ connectivity lost                      reactivate()
//!      └─────────────────────────► Inactive ─────────────────────► Healthy
//! ```
//!
//! The failure count is forgotten after `error_reset_period` without a
//! failure.

use crate::config::HealthConfig;
use chrono::Duration;
use kestrel_core::Timestamp;
use log::{info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    /// Quoting suspended until the given time
    Degraded { until: Timestamp },
    /// Switched off until reactivated by the operator
    Inactive { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Clone)]
pub struct SymbolHealth {
    symbol: String,
    config: HealthConfig,
    status: HealthStatus,
    consecutive_errors: u32,
    total_errors: u64,
    last_error: Option<Timestamp>,
}

impl SymbolHealth {
    pub fn new(symbol: impl Into<String>, config: HealthConfig) -> Self {
        Self {
            symbol: symbol.into(),
            config,
            status: HealthStatus::Healthy,
            consecutive_errors: 0,
            total_errors: 0,
            last_error: None,
        }
    }

    pub fn status(&self) -> &HealthStatus {
        &self.status
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors
    }

    /// Whether the symbol may quote at `now`. Ends an expired suspension.
    pub fn can_trade(&mut self, now: Timestamp) -> bool {
        if let HealthStatus::Degraded { until } = self.status {
            if now >= until {
                info!("[SESSION] {} recovered, resuming quotes", self.symbol);
                self.status = HealthStatus::Healthy;
                self.consecutive_errors = 0;
            }
        }
        self.status.is_healthy()
    }

    pub fn record_error(&mut self, now: Timestamp) {
        self.forget_stale_errors(now);
        self.consecutive_errors += 1;
        self.total_errors += 1;
        self.last_error = Some(now);

        if self.consecutive_errors >= self.config.max_errors && self.status.is_healthy() {
            let until = now + millis(self.config.recovery_delay_ms);
            warn!(
                "[SESSION] {} degraded after {} consecutive errors, suspended until {}",
                self.symbol, self.consecutive_errors, until
            );
            self.status = HealthStatus::Degraded { until };
        }
    }

    pub fn record_success(&mut self, now: Timestamp) {
        self.forget_stale_errors(now);
    }

    pub fn deactivate(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("[SESSION] {} deactivated: {}", self.symbol, reason);
        self.status = HealthStatus::Inactive { reason };
    }

    pub fn reactivate(&mut self) {
        info!("[SESSION] {} reactivated", self.symbol);
        self.status = HealthStatus::Healthy;
        self.consecutive_errors = 0;
        self.last_error = None;
    }

    fn forget_stale_errors(&mut self, now: Timestamp) {
        if let Some(last) = self.last_error {
            if now - last >= millis(self.config.error_reset_period_ms) {
                self.consecutive_errors = 0;
            }
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX))
}
