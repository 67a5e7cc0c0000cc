//! Backtest output and its export formats

use crate::analytics::BookAnalytics;
use crate::error::Result;
use crate::performance::PerformanceMetrics;
use kestrel_core::{OrderId, Side, Timestamp};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// One simulated fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: Timestamp,
    pub order_id: OrderId,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    /// Mid of the snapshot the fill happened on
    pub mid: f64,
    pub transaction_cost: f64,
    /// Total slippage charged, market impact included
    pub slippage: f64,
    /// Liquidity-scaled part of the slippage
    pub market_impact: f64,
}

impl TradeRecord {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Scalar figures describing the replay as a whole
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_capital: f64,
    pub final_equity: f64,
    /// Largest |position * mid| / equity seen on any bar
    pub max_leverage_used: f64,
    pub avg_position: f64,
    pub max_position: f64,
    /// Traded notional over initial capital
    pub turnover_ratio: f64,
    pub avg_market_impact: f64,
    pub total_transaction_costs: f64,
    pub total_slippage: f64,
    pub trade_count: usize,
    pub bars: usize,
    /// Time the circuit breaker tripped, if it did
    pub halted_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestResults {
    pub timestamps: Vec<Timestamp>,
    pub equity_curve: Vec<f64>,
    pub drawdown_curve: Vec<f64>,
    /// `(mid, position)` after each bar
    pub position_history: Vec<(f64, f64)>,
    pub trade_history: Vec<TradeRecord>,
    pub metrics: PerformanceMetrics,
    pub summary: BacktestSummary,
    pub analytics: BookAnalytics,
}

impl BacktestResults {
    pub fn final_equity(&self) -> Option<f64> {
        self.equity_curve.last().copied()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Write `equity.csv` and `trades.csv` into `dir`, creating it if needed
    pub fn save_csv(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let mut equity = BufWriter::new(File::create(dir.join("equity.csv"))?);
        writeln!(equity, "timestamp,equity,drawdown,mid,position")?;
        for (i, ts) in self.timestamps.iter().enumerate() {
            let (mid, position) = self.position_history.get(i).copied().unwrap_or_default();
            writeln!(
                equity,
                "{},{},{},{},{}",
                ts.to_rfc3339(),
                self.equity_curve.get(i).copied().unwrap_or_default(),
                self.drawdown_curve.get(i).copied().unwrap_or_default(),
                mid,
                position
            )?;
        }
        equity.flush()?;

        let mut trades = BufWriter::new(File::create(dir.join("trades.csv"))?);
        writeln!(
            trades,
            "timestamp,order_id,side,price,quantity,mid,transaction_cost,slippage,market_impact"
        )?;
        for t in &self.trade_history {
            writeln!(
                trades,
                "{},{},{:?},{},{},{},{},{},{}",
                t.timestamp.to_rfc3339(),
                t.order_id,
                t.side,
                t.price,
                t.quantity,
                t.mid,
                t.transaction_cost,
                t.slippage,
                t.market_impact
            )?;
        }
        trades.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn results() -> BacktestResults {
        let now = Utc::now();
        BacktestResults {
            timestamps: vec![now, now],
            equity_curve: vec![100.0, 101.0],
            drawdown_curve: vec![0.0, 0.0],
            position_history: vec![(100.0, 0.0), (101.0, 1.0)],
            trade_history: vec![TradeRecord {
                timestamp: now,
                order_id: 3,
                side: Side::Buy,
                price: 99.5,
                quantity: 1.0,
                mid: 100.0,
                transaction_cost: 0.0,
                slippage: 0.0,
                market_impact: 0.0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_csv_export() {
        let dir = std::env::temp_dir().join(format!("kestrel-csv-{}", std::process::id()));
        results().save_csv(&dir).unwrap();

        let equity = fs::read_to_string(dir.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 3);
        let trades = fs::read_to_string(dir.join("trades.csv")).unwrap();
        assert!(trades.lines().nth(1).unwrap().contains(",3,Buy,99.5,"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_json_export_parses_back() {
        let json = results().to_json().unwrap();
        let parsed: BacktestResults = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trade_history.len(), 1);
        assert_eq!(parsed.final_equity(), Some(101.0));
    }
}
