/// Port for the price-forecasting model.
///
/// A pure, synchronous call. `None` means "no forecast available" and is
/// never fatal to the trading loop.
pub trait Forecaster: Send + Sync {
    fn predict(&self, features: &[f64]) -> Option<Vec<f64>>;
}
