//! Recorded market data

use crate::error::{BacktestError, Result};
use kestrel_core::MarketDepth;
use log::info;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read one JSON `MarketDepth` per line. Blank lines are skipped.
pub fn load_snapshots(path: impl AsRef<Path>) -> Result<Vec<MarketDepth>> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let mut snapshots = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        snapshots.push(serde_json::from_str(line)?);
    }
    info!(
        "[BACKTEST] Loaded {} snapshots from {}",
        snapshots.len(),
        path.display()
    );
    Ok(snapshots)
}

/// Position of the first snapshot older than its predecessor
pub fn first_out_of_order(snapshots: &[MarketDepth]) -> Option<usize> {
    snapshots
        .windows(2)
        .position(|w| w[1].last_update < w[0].last_update)
        .map(|i| i + 1)
}

/// Reject empty or unordered input
pub fn validate(snapshots: &[MarketDepth]) -> Result<()> {
    if snapshots.is_empty() {
        return Err(BacktestError::NoData);
    }
    match first_out_of_order(snapshots) {
        Some(index) => Err(BacktestError::OutOfOrder { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::flat_series;
    use std::io::Write;

    #[test]
    fn test_load_jsonl() {
        let series = flat_series("XBTUSD", 100.0, 3);
        let path = std::env::temp_dir().join(format!("kestrel-data-{}.jsonl", std::process::id()));
        {
            let mut file = File::create(&path).unwrap();
            for depth in &series {
                writeln!(file, "{}", serde_json::to_string(depth).unwrap()).unwrap();
            }
            writeln!(file).unwrap();
        }
        let loaded = load_snapshots(&path).unwrap();
        assert_eq!(loaded, series);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_validate() {
        assert!(matches!(validate(&[]), Err(BacktestError::NoData)));

        let mut series = flat_series("XBTUSD", 100.0, 4);
        assert!(validate(&series).is_ok());
        series.swap(1, 2);
        assert!(matches!(
            validate(&series),
            Err(BacktestError::OutOfOrder { index: 2 })
        ));
    }
}
