//! Error types for the runner crate

use thiserror::Error;

/// Startup configuration problems. All of them are fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunnerError {
    #[error("Symbol {0} is already running")]
    DuplicateSymbol(String),

    #[error("No session for symbol {0}")]
    UnknownSymbol(String),

    #[error("Session for {0} has stopped")]
    SessionClosed(String),
}
