//! Execution manager
//!
//! ```text
//!   submit_order(order)
//!         │
//!   ┌─────▼──────┐  fail   ┌──────────────────────┐
//!   │ pre-trade  │────────►│ Rejected(violation)  │  (0 connector calls)
//!   └─────┬──────┘         └──────────────────────┘
//!         │ pass
//!   ┌─────▼──────┐  Ok(true)  ┌──────────────────────┐
//!   │  attempt n │───────────►│ Submitted{attempts}  │
//!   └─────┬──────┘            └──────────────────────┘
//!         │ Err / Ok(false)
//!         ├── n < max ── sleep(retry_delay) ──► attempt n+1
//!         └── n = max ──► Exhausted{attempts}
//! ```

use crate::config::ExecutionConfig;
use kestrel_core::{Order, OrderId, Side};
use kestrel_ports::{ConnectorError, ConnectorResult, ExchangeConnector};
use log::{debug, info, warn};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Why a submission never reached the venue
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreTradeViolation {
    #[error("order value {value:.2} exceeds {limit:.2}")]
    OrderValue { value: f64, limit: f64 },

    #[error("projected position value {value:.2} exceeds {limit:.2}")]
    PositionValue { value: f64, limit: f64 },

    #[error("leverage {leverage:.2} exceeds {limit:.2}")]
    Leverage { leverage: f64, limit: f64 },

    #[error("position unavailable: {0}")]
    PositionUnavailable(ConnectorError),

    #[error("leverage unavailable: {0}")]
    LeverageUnavailable(ConnectorError),
}

/// Result of [`ExecutionManager::submit_order`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted {
        attempts: u32,
    },
    Rejected(PreTradeViolation),
    Exhausted {
        attempts: u32,
        last_error: Option<ConnectorError>,
    },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmitOutcome::Submitted { .. })
    }

    /// Connector calls made for this submission
    pub fn attempts(&self) -> u32 {
        match self {
            SubmitOutcome::Submitted { attempts } | SubmitOutcome::Exhausted { attempts, .. } => {
                *attempts
            }
            SubmitOutcome::Rejected(_) => 0,
        }
    }

    /// True when the venue reported lost connectivity on the last attempt
    pub fn lost_connectivity(&self) -> bool {
        matches!(
            self,
            SubmitOutcome::Exhausted {
                last_error: Some(e),
                ..
            } if e.is_connectivity()
        )
    }
}

/// Counters for monitoring
#[derive(Debug, Default)]
pub struct ExecutionStats {
    pub submitted: AtomicU64,
    pub rejected: AtomicU64,
    pub exhausted: AtomicU64,
    pub retries: AtomicU64,
}

enum RetryResult {
    Succeeded(u32),
    Exhausted(u32, Option<ConnectorError>),
}

/// Routes orders to an [`ExchangeConnector`] with pre-trade checks and a
/// bounded retry loop.
pub struct ExecutionManager {
    config: ExecutionConfig,
    connector: Arc<dyn ExchangeConnector>,
    stats: ExecutionStats,
}

impl ExecutionManager {
    pub fn new(config: ExecutionConfig, connector: Arc<dyn ExchangeConnector>) -> Self {
        Self {
            config,
            connector,
            stats: ExecutionStats::default(),
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn connector(&self) -> &Arc<dyn ExchangeConnector> {
        &self.connector
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Run pre-trade checks, then place the order with retries
    pub async fn submit_order(&self, order: &Order) -> SubmitOutcome {
        if let Err(violation) = self.pre_trade_check(order).await {
            warn!("[EXEC] Order {} rejected pre-trade: {}", order.id, violation);
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Rejected(violation);
        }

        match self
            .with_retry("place_order", order.id, || self.connector.place_order(order))
            .await
        {
            RetryResult::Succeeded(attempts) => {
                info!(
                    "[EXEC] Order {} {:?} {}@{} placed after {} attempt(s)",
                    order.id, order.side, order.quantity, order.price, attempts
                );
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Submitted { attempts }
            }
            RetryResult::Exhausted(attempts, last_error) => {
                self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
                SubmitOutcome::Exhausted {
                    attempts,
                    last_error,
                }
            }
        }
    }

    /// Cancel with retries. No pre-trade checks apply.
    pub async fn cancel_order(&self, order_id: OrderId) -> bool {
        matches!(
            self.with_retry("cancel_order", order_id, || self.connector.cancel_order(order_id))
                .await,
            RetryResult::Succeeded(_)
        )
    }

    /// Amend with retries. No pre-trade checks apply.
    pub async fn amend_order(&self, order: &Order) -> bool {
        matches!(
            self.with_retry("amend_order", order.id, || self.connector.amend_order(order))
                .await,
            RetryResult::Succeeded(_)
        )
    }

    /// Order value, projected position value, then leverage
    pub async fn pre_trade_check(&self, order: &Order) -> Result<(), PreTradeViolation> {
        let order_value = order.price * order.quantity;
        if order_value > self.config.max_order_value {
            return Err(PreTradeViolation::OrderValue {
                value: order_value,
                limit: self.config.max_order_value,
            });
        }

        let position = self
            .connector
            .get_current_position()
            .await
            .map_err(PreTradeViolation::PositionUnavailable)?;
        let projected = match order.side {
            Side::Buy => position + order.quantity,
            Side::Sell => position - order.quantity,
        };
        let position_value = (projected * order.price).abs();
        if position_value > self.config.max_position_value {
            return Err(PreTradeViolation::PositionValue {
                value: position_value,
                limit: self.config.max_position_value,
            });
        }

        let leverage = self
            .connector
            .get_current_leverage()
            .await
            .map_err(PreTradeViolation::LeverageUnavailable)?;
        if leverage > self.config.max_leverage {
            return Err(PreTradeViolation::Leverage {
                leverage,
                limit: self.config.max_leverage,
            });
        }

        Ok(())
    }

    async fn with_retry<F, Fut>(&self, operation: &str, order_id: OrderId, mut call: F) -> RetryResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ConnectorResult<bool>>,
    {
        let max_attempts = self.config.max_retry_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match call().await {
                Ok(true) => return RetryResult::Succeeded(attempt),
                Ok(false) => {
                    warn!(
                        "[EXEC] {} for order {} declined by {} (attempt {}/{})",
                        operation,
                        order_id,
                        self.connector.name(),
                        attempt,
                        max_attempts
                    );
                    last_error = None;
                }
                Err(e) => {
                    warn!(
                        "[EXEC] {} for order {} failed: {} (attempt {}/{})",
                        operation, order_id, e, attempt, max_attempts
                    );
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
                debug!("[EXEC] Retrying {} in {:?}", operation, self.config.retry_delay());
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        warn!(
            "[EXEC] {} for order {} exhausted after {} attempts",
            operation, order_id, max_attempts
        );
        RetryResult::Exhausted(max_attempts, last_error)
    }
}
