//! Kestrel Ports
//!
//! Port definitions (traits) for the Kestrel market-making engine.
//! These define the boundaries between the trading core and its collaborators:
//! time, the exchange connection and the forecasting model.

mod clock;
mod connector;
mod error;
mod forecast;

pub use clock::Clock;
pub use connector::{ExchangeConnector, ExecutionReport};
pub use error::{ConnectorError, ConnectorResult};
pub use forecast::Forecaster;
