//! Exchange adapters
//!
//! Implementations of the [`ExchangeConnector`](kestrel_ports::ExchangeConnector)
//! port. Only the in-memory simulator lives here; venue adapters plug in the
//! same way.

mod simulated;

pub use simulated::SimulatedConnector;
