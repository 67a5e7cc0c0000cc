//! Engine configuration
//!
//! Loaded from JSON, then overridden from `KESTREL_*` environment variables,
//! then validated. Every section falls back to its defaults when omitted.
//!
//! ```json
//! {
//!   "num_threads": 4,
//!   "log_level": "info",
//!   "symbols": [
//!     { "order_manager": { "symbol": "XBTUSD" }, "strategy": { "risk_aversion": 0.2 } }
//!   ],
//!   "backtest": { "warm_up_bars": 50 }
//! }
//! ```

use crate::error::ConfigError;
use kestrel_backtest::BacktestConfig;
use kestrel_gateway::ExecutionConfig;
use kestrel_order_manager::OrderManagerConfig;
use kestrel_risk_manager::RiskLimits;
use kestrel_strategy::StoikovConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

pub const ENV_NUM_THREADS: &str = "KESTREL_NUM_THREADS";
pub const ENV_LOG_LEVEL: &str = "KESTREL_LOG_LEVEL";
pub const ENV_DATA_PATH: &str = "KESTREL_DATA_PATH";
pub const ENV_OUTPUT_PATH: &str = "KESTREL_OUTPUT_PATH";

/// Everything needed to run one symbol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolConfig {
    /// Local order limits; its `symbol` names the session
    pub order_manager: OrderManagerConfig,
    pub risk: RiskLimits,
    pub strategy: StoikovConfig,
    pub execution: ExecutionConfig,
}

impl SymbolConfig {
    pub fn for_symbol(symbol: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.order_manager.symbol = symbol.into();
        config
    }

    pub fn symbol(&self) -> &str {
        &self.order_manager.symbol
    }
}

/// Error tolerance of a live symbol session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Consecutive failures before quoting is suspended
    pub max_errors: u32,
    /// Suspension after too many failures, in milliseconds
    pub recovery_delay_ms: u64,
    /// Quiet period after which the failure count is forgotten, in milliseconds
    pub error_reset_period_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_errors: 3,
            recovery_delay_ms: 60_000,
            error_reset_period_ms: 300_000,
        }
    }
}

impl HealthConfig {
    pub fn recovery_delay(&self) -> Duration {
        Duration::from_millis(self.recovery_delay_ms)
    }

    pub fn error_reset_period(&self) -> Duration {
        Duration::from_millis(self.error_reset_period_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads of the tokio runtime
    pub num_threads: usize,
    /// Default log filter; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Snapshot file replayed by `kestrel backtest`
    pub data_path: String,
    /// Directory for backtest results
    pub output_path: String,
    pub symbols: Vec<SymbolConfig>,
    pub backtest: BacktestConfig,
    pub health: HealthConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_threads: 4,
            log_level: "info".to_string(),
            data_path: "data/snapshots.jsonl".to_string(),
            output_path: "results".to_string(),
            symbols: vec![SymbolConfig::default()],
            backtest: BacktestConfig::default(),
            health: HealthConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `KESTREL_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_NUM_THREADS) {
            self.num_threads = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be an integer, got '{}'", ENV_NUM_THREADS, raw))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(path) = lookup(ENV_DATA_PATH) {
            self.data_path = path;
        }
        if let Some(path) = lookup(ENV_OUTPUT_PATH) {
            self.output_path = path;
        }
        Ok(())
    }

    pub fn symbol(&self, symbol: &str) -> Option<&SymbolConfig> {
        self.symbols.iter().find(|s| s.symbol() == symbol)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(invalid("num_threads must be at least 1"));
        }
        if self.data_path.trim().is_empty() {
            return Err(invalid("data_path is empty"));
        }
        if self.output_path.trim().is_empty() {
            return Err(invalid("output_path is empty"));
        }
        if self.symbols.is_empty() {
            return Err(invalid("no symbols configured"));
        }

        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if symbol.symbol().is_empty() {
                return Err(invalid("symbol name is empty"));
            }
            if !seen.insert(symbol.symbol()) {
                return Err(invalid(format!("symbol {} configured twice", symbol.symbol())));
            }
            validate_symbol(symbol)?;
        }

        let bt = &self.backtest;
        positive("backtest.initial_capital", bt.initial_capital)?;
        non_negative("backtest.transaction_cost_bps", bt.transaction_cost_bps)?;
        non_negative("backtest.slippage_bps", bt.slippage_bps)?;
        positive("backtest.periods_per_year", bt.periods_per_year)?;

        if self.health.max_errors == 0 {
            return Err(invalid("health.max_errors must be at least 1"));
        }
        Ok(())
    }
}

fn validate_symbol(config: &SymbolConfig) -> Result<(), ConfigError> {
    let name = config.symbol();
    let field = |f: &str| format!("{}.{}", name, f);

    let om = &config.order_manager;
    positive(&field("max_position"), om.max_position)?;
    positive(&field("max_order_size"), om.max_order_size)?;
    positive(&field("max_notional"), om.max_notional)?;
    if om.max_active_orders == 0 {
        return Err(invalid(format!("{} must be at least 1", field("max_active_orders"))));
    }

    let risk = &config.risk;
    positive(&field("max_order_value"), risk.max_order_value)?;
    positive(&field("max_message_rate_per_second"), risk.max_message_rate_per_second)?;
    positive(&field("var_limit"), risk.var_limit)?;
    positive(&field("loss_threshold"), risk.breaker.loss_threshold)?;
    positive(&field("max_drawdown"), risk.breaker.max_drawdown)?;
    if !(risk.var_confidence > 0.0 && risk.var_confidence < 1.0) {
        return Err(invalid(format!("{} must be in (0, 1)", field("var_confidence"))));
    }

    let s = &config.strategy;
    positive(&field("risk_aversion"), s.risk_aversion)?;
    positive(&field("market_impact"), s.market_impact)?;
    positive(&field("time_horizon"), s.time_horizon)?;
    positive(&field("position_limit"), s.position_limit)?;
    positive(&field("base_size"), s.base_size)?;
    if s.volatility_window < 2 {
        return Err(invalid(format!("{} must be at least 2", field("volatility_window"))));
    }
    if let Some(tick) = s.tick_size {
        positive(&field("tick_size"), tick)?;
    }

    let exec = &config.execution;
    if exec.max_retry_attempts == 0 {
        return Err(invalid(format!("{} must be at least 1", field("max_retry_attempts"))));
    }
    positive(&field("max_position_value"), exec.max_position_value)?;
    positive(&field("execution.max_order_value"), exec.max_order_value)?;
    positive(&field("max_leverage"), exec.max_leverage)?;
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be positive, got {}", name, value)))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must not be negative, got {}", name, value)))
    }
}
