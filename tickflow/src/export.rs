//! CSV export of signals and the latency histogram.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use signal_engine::LatencyHistogram;

use crate::sink::SignalRow;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes `signals.csv`-style rows.
pub fn export_signals(path: &Path, rows: &[SignalRow]) -> Result<(), ExportError> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(
        file,
        "timestamp,signal_id,type,primary_symbol,secondary_symbol,signal_strength,confidence,latency_us"
    )?;
    for row in rows {
        writeln!(
            file,
            "{},{},{},{},{},{:.6},{:.2},{}",
            row.timestamp_ms,
            row.signal_id,
            row.kind.as_str(),
            row.primary_symbol,
            row.secondary_symbol.unwrap_or(""),
            row.signal_strength,
            row.confidence,
            row.latency_us,
        )?;
    }
    file.flush()?;
    Ok(())
}

/// Writes the latency histogram bucket table.
pub fn export_latency_histogram(path: &Path, hist: &LatencyHistogram) -> Result<(), ExportError> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "lower_bound_us,upper_bound_us,count,percentage")?;
    for bucket in hist.snapshot() {
        writeln!(
            file,
            "{},{},{},{:.4}",
            bucket.lower_bound_us, bucket.upper_bound_us, bucket.count, bucket.percentage,
        )?;
    }
    file.flush()?;
    Ok(())
}
