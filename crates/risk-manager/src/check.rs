//! Pre-trade check outcome

use thiserror::Error;

/// Why the risk manager refused an order
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskRejection {
    #[error("trading halted by circuit breaker")]
    Halted,

    #[error("order value {value} exceeds {limit}")]
    OrderValue { value: f64, limit: f64 },

    #[error("message rate {rate:.2}/s exceeds {limit}/s")]
    MessageRate { rate: f64, limit: f64 },

    #[error("adverse selection {cost:.5} exceeds {limit}")]
    AdverseSelection { cost: f64, limit: f64 },
}

/// Result of a pre-trade risk check. A rejection is a normal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskCheck {
    Pass,
    Reject(RiskRejection),
}

impl RiskCheck {
    pub fn is_pass(&self) -> bool {
        matches!(self, RiskCheck::Pass)
    }

    pub fn rejection(&self) -> Option<&RiskRejection> {
        match self {
            RiskCheck::Pass => None,
            RiskCheck::Reject(reason) => Some(reason),
        }
    }
}
