//! Error types for the gateway crate

use thiserror::Error;

/// Gateway-level errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The subscriber side of a venue stream was dropped
    #[error("Channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, GatewayError>;
