//! Execution layer configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy and pre-trade limits for the execution manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Total attempts per operation, including the first
    pub max_retry_attempts: u32,
    /// Pause between attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Limit on |projected position * price|
    pub max_position_value: f64,
    /// Limit on price * quantity of a single order
    pub max_order_value: f64,
    pub max_leverage: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retry_attempts: 3,
            retry_delay_ms: 500,
            max_position_value: 100_000.0,
            max_order_value: 10_000.0,
            max_leverage: 5.0,
        }
    }
}

impl ExecutionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ExecutionConfig =
            serde_json::from_str(r#"{"max_retry_attempts": 5}"#).unwrap();
        assert_eq!(config.max_retry_attempts, 5);
        assert_eq!(config.max_leverage, 5.0);
    }
}
