//! Circuit breaker
//!
//! ```text
//!            breach (loss / drawdown / stress)
//!   Armed ───────────────────────────────────► Triggered
//!     ▲                                            │
//!     └──────────── reset_session() ───────────────┘
//! ```
//!
//! There is no timed re-arm: once tripped, the session stays halted until an
//! operator (or a new session) resets it explicitly.

use crate::limits::BreakerConfig;
use kestrel_core::Timestamp;
use log::{error, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakerState {
    Armed,
    Triggered,
}

/// What tripped the breaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TripReason {
    DailyLoss { daily_pnl: f64, threshold: f64 },
    Drawdown { drawdown: f64, limit: f64 },
    StressTest { stressed_loss: f64, limit: f64 },
    Manual(String),
}

impl fmt::Display for TripReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TripReason::DailyLoss {
                daily_pnl,
                threshold,
            } => write!(f, "daily P&L {:.2} below -{:.2}", daily_pnl, threshold),
            TripReason::Drawdown { drawdown, limit } => {
                write!(f, "drawdown {:.2} exceeds {:.2}", drawdown, limit)
            }
            TripReason::StressTest {
                stressed_loss,
                limit,
            } => write!(f, "stressed loss {:.2} exceeds VaR limit {:.2}", stressed_loss, limit),
            TripReason::Manual(reason) => write!(f, "manual halt: {}", reason),
        }
    }
}

/// Time and cause of the trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub reason: TripReason,
    pub triggered_at: Timestamp,
}

pub struct CircuitBreaker {
    config: BreakerConfig,
    triggered: AtomicBool,
    record: Mutex<Option<TripRecord>>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            triggered: AtomicBool::new(false),
            record: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> BreakerState {
        if self.is_triggered() {
            BreakerState::Triggered
        } else {
            BreakerState::Armed
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Threshold breach for the given aggregates, if any
    pub fn breach(&self, daily_pnl: f64, max_drawdown: f64) -> Option<TripReason> {
        if daily_pnl < -self.config.loss_threshold {
            return Some(TripReason::DailyLoss {
                daily_pnl,
                threshold: self.config.loss_threshold,
            });
        }
        if max_drawdown > self.config.max_drawdown {
            return Some(TripReason::Drawdown {
                drawdown: max_drawdown,
                limit: self.config.max_drawdown,
            });
        }
        None
    }

    /// Move to Triggered. Returns `false` if it already was; the first trip
    /// record is kept.
    pub fn trip(&self, reason: TripReason, now: Timestamp) -> bool {
        let mut record = self.record.lock();
        if self.triggered.swap(true, Ordering::AcqRel) {
            return false;
        }
        error!("[RISK] Circuit breaker triggered: {}", reason);
        *record = Some(TripRecord {
            reason,
            triggered_at: now,
        });
        true
    }

    pub fn trip_record(&self) -> Option<TripRecord> {
        self.record.lock().clone()
    }

    pub fn trigger_time(&self) -> Option<Timestamp> {
        self.record.lock().as_ref().map(|r| r.triggered_at)
    }

    /// Re-arm. Only called on an explicit session reset.
    pub fn reset(&self) {
        let mut record = self.record.lock();
        if self.triggered.swap(false, Ordering::AcqRel) {
            info!("[RISK] Circuit breaker re-armed");
        }
        *record = None;
    }
}
