//! Error types for the backtest crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("No market data to replay")]
    NoData,

    #[error("Snapshot {index} is older than its predecessor")]
    OutOfOrder { index: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BacktestError>;
