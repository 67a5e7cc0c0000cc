//! Risk Manager
//!
//! Global, cross-order risk gating:
//! - Pre-trade checks: order value, message rate, adverse selection
//! - Post-fill metrics: cash-flow P&L, drawdown, price history, VaR
//! - Circuit breaker: halts the session on loss, drawdown or stress breach

use crate::breaker::{BreakerState, CircuitBreaker, TripReason, TripRecord};
use crate::check::{RiskCheck, RiskRejection};
use crate::limits::RiskLimits;
use crate::metrics::{MetricsState, RiskSnapshot, RiskTelemetry, adverse_selection};
use crate::var::{historical_var, log_returns};
use kestrel_core::{Fill, MarketDepth, Order, Timestamp};
use kestrel_ports::Clock;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

pub struct RiskManager {
    limits: RiskLimits,
    clock: Arc<dyn Clock>,
    /// Start of the message-rate window, ns since epoch
    window_start: AtomicI64,
    metrics: Mutex<MetricsState>,
    telemetry: RiskTelemetry,
    breaker: CircuitBreaker,
}

impl RiskManager {
    pub fn new(limits: RiskLimits, clock: Arc<dyn Clock>) -> Self {
        let window_start = AtomicI64::new(nanos(clock.now()));
        let breaker = CircuitBreaker::new(limits.breaker.clone());
        info!(
            "[RISK] Risk manager up: max_order_value={}, max_msg_rate={}/s, var_limit={}, loss_threshold={}",
            limits.max_order_value,
            limits.max_message_rate_per_second,
            limits.var_limit,
            limits.breaker.loss_threshold
        );
        Self {
            limits,
            clock,
            window_start,
            metrics: Mutex::new(MetricsState::default()),
            telemetry: RiskTelemetry::default(),
            breaker,
        }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Pre-trade check. Fails closed while the breaker is triggered.
    ///
    /// An accepted order counts as one message against the rate limit.
    pub fn check_order_risk(&self, order: &Order, depth: &MarketDepth) -> RiskCheck {
        match self.order_rejection(order, depth) {
            Some(reason) => {
                debug!("[RISK] Order {} rejected: {}", order.id, reason);
                RiskCheck::Reject(reason)
            }
            None => {
                self.telemetry.message_count.fetch_add(1, Ordering::AcqRel);
                RiskCheck::Pass
            }
        }
    }

    fn order_rejection(&self, order: &Order, depth: &MarketDepth) -> Option<RiskRejection> {
        if self.breaker.is_triggered() {
            return Some(RiskRejection::Halted);
        }

        let value = order.price * order.quantity;
        if value > self.limits.max_order_value {
            return Some(RiskRejection::OrderValue {
                value,
                limit: self.limits.max_order_value,
            });
        }

        // Rate is evaluated once the window spans a full second
        let elapsed = self.window_elapsed_secs();
        if elapsed >= 1.0 {
            let rate = self.telemetry.message_count.load(Ordering::Acquire) as f64 / elapsed;
            if rate > self.limits.max_message_rate_per_second {
                return Some(RiskRejection::MessageRate {
                    rate,
                    limit: self.limits.max_message_rate_per_second,
                });
            }
        }

        // No two-sided book means no reference mid; the check does not apply
        if let Some(mid) = depth.mid_price() {
            let cost = adverse_selection(order.side, order.price, mid);
            if cost > self.limits.max_adverse_selection {
                return Some(RiskRejection::AdverseSelection {
                    cost,
                    limit: self.limits.max_adverse_selection,
                });
            }
        }
        None
    }

    fn window_elapsed_secs(&self) -> f64 {
        let start = self.window_start.load(Ordering::Acquire);
        (nanos(self.clock.now()) - start) as f64 / 1e9
    }

    /// Fold a fill into the session aggregates, then re-evaluate the breaker
    pub fn update_metrics(&self, fill: &Fill, depth: &MarketDepth) {
        let pnl = fill.cash_flow();
        let (position_value, var) = {
            let mut m = self.metrics.lock();
            m.daily_pnl += pnl;
            if pnl < 0.0 {
                m.max_drawdown = m.max_drawdown.max(-pnl);
            }
            m.position += fill.signed_quantity();

            let mark = depth.mid_price();
            if let Some(mid) = mark {
                m.adverse_selection_sum += adverse_selection(fill.side, fill.price, mid);
                m.fills += 1;
                m.push_price(mid, self.limits.price_history_capacity);
            }
            m.position_value = m.position * mark.unwrap_or(fill.price);

            if m.prices.len() >= 2 {
                let returns = log_returns(m.prices.iter());
                m.var = historical_var(&returns, self.limits.var_confidence);
            }
            self.telemetry.publish(&m);
            (m.position_value, m.var)
        };

        if !self.stress_test(position_value, var) {
            self.breaker.trip(
                TripReason::StressTest {
                    stressed_loss: self.stressed_loss(position_value, var),
                    limit: self.limits.var_limit,
                },
                self.clock.now(),
            );
        }
        self.check_circuit_breakers();
    }

    /// Historical VaR of `returns`, followed by the stress test against the
    /// current position value. A failed stress test trips the breaker.
    pub fn calculate_var(&self, returns: &[f64], confidence: f64) -> f64 {
        let var = historical_var(returns, confidence);
        let position_value = self.telemetry.position_value.load(Ordering::Acquire);
        if !self.stress_test(position_value, var) {
            warn!("[RISK] Stress test failed: position_value={:.2}, var={:.5}", position_value, var);
            self.breaker.trip(
                TripReason::StressTest {
                    stressed_loss: self.stressed_loss(position_value, var),
                    limit: self.limits.var_limit,
                },
                self.clock.now(),
            );
        }
        var
    }

    fn stressed_loss(&self, position_value: f64, var: f64) -> f64 {
        position_value.abs() * var * self.limits.stress_test_multiplier
    }

    /// `|position_value| * var * multiplier <= var_limit`
    pub fn stress_test(&self, position_value: f64, var: f64) -> bool {
        self.stressed_loss(position_value, var) <= self.limits.var_limit
    }

    /// Trip the breaker if daily P&L or drawdown breach their thresholds.
    ///
    /// Returns whether trading is halted.
    pub fn check_circuit_breakers(&self) -> bool {
        if self.breaker.is_triggered() {
            return true;
        }
        let breach = {
            let m = self.metrics.lock();
            self.breaker.breach(m.daily_pnl, m.max_drawdown)
        };
        if let Some(reason) = breach {
            self.breaker.trip(reason, self.clock.now());
        }
        self.breaker.is_triggered()
    }

    /// Halt trading for an external reason
    pub fn halt_trading(&self, reason: impl Into<String>) {
        self.breaker
            .trip(TripReason::Manual(reason.into()), self.clock.now());
    }

    pub fn is_halted(&self) -> bool {
        self.breaker.is_triggered()
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.state()
    }

    pub fn trigger_time(&self) -> Option<Timestamp> {
        self.breaker.trigger_time()
    }

    pub fn trip_record(&self) -> Option<TripRecord> {
        self.breaker.trip_record()
    }

    /// Latest aggregates, read without taking the metrics lock
    pub fn snapshot(&self) -> RiskSnapshot {
        RiskSnapshot {
            var: self.telemetry.var.load(Ordering::Acquire),
            daily_pnl: self.telemetry.daily_pnl.load(Ordering::Acquire),
            max_drawdown: self.telemetry.max_drawdown.load(Ordering::Acquire),
            position: self.telemetry.position.load(Ordering::Acquire),
            position_value: self.telemetry.position_value.load(Ordering::Acquire),
            adverse_selection: self.telemetry.adverse_selection.load(Ordering::Acquire),
            message_count: self.telemetry.message_count.load(Ordering::Acquire),
            breaker: self.breaker.state(),
        }
    }

    /// Start a new trading day: zero P&L, drawdown and the message window.
    ///
    /// Does not re-arm a triggered breaker.
    pub fn reset_daily_metrics(&self) {
        let mut m = self.metrics.lock();
        m.daily_pnl = 0.0;
        m.max_drawdown = 0.0;
        self.telemetry.publish(&m);
        self.telemetry.message_count.store(0, Ordering::Release);
        self.window_start
            .store(nanos(self.clock.now()), Ordering::Release);
        info!("[RISK] Daily metrics reset");
    }

    /// Start a new session: daily reset, clear price history and VaR, and
    /// re-arm the breaker.
    pub fn reset_session(&self) {
        {
            let mut m = self.metrics.lock();
            *m = MetricsState::default();
            self.telemetry.publish(&m);
        }
        self.telemetry.message_count.store(0, Ordering::Release);
        self.window_start
            .store(nanos(self.clock.now()), Ordering::Release);
        self.breaker.reset();
        info!("[RISK] Session reset");
    }
}

fn nanos(ts: Timestamp) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or_default()
}
