use thiserror::Error;

/// Failures reported by an exchange connector.
///
/// Mirrors the exchange's error codes; every variant is treated as transient
/// by the execution layer except where a caller decides otherwise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    #[error("Connectivity lost: {0}")]
    ConnectivityLost(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Request timed out")]
    Timeout,

    #[error("System error: {0}")]
    SystemError(String),
}

impl ConnectorError {
    /// Errors after which the venue cannot be traded until reconnected
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ConnectorError::ConnectivityLost(_))
    }
}

pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;
