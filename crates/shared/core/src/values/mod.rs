use chrono::{DateTime, Utc};

/// Price value. The quoting model works in floating point end to end.
pub type Price = f64;

/// Quantity value in contracts
pub type Quantity = f64;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for a tradeable instrument
pub type Symbol = String;
