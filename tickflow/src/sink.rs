//! Signal sink: logs fired signals and buffers rows for CSV export.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::info;

use market_data::{SignalEvent, SignalKind};

/// One exported signal row.
#[derive(Debug, Clone)]
pub struct SignalRow {
    /// Wall-clock capture time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    pub signal_id: u64,
    pub kind: SignalKind,
    pub primary_symbol: &'static str,
    pub secondary_symbol: Option<&'static str>,
    pub signal_strength: f64,
    pub confidence: f64,
    pub latency_us: u64,
}

/// Collects signal events from the router sink.
///
/// `record` runs on the consumer thread inside the hot path: it takes one
/// short mutex push per fired signal, which is rare relative to ticks.
pub struct SignalLogger {
    rows: Mutex<Vec<SignalRow>>,
    count: AtomicU64,
    quiet: bool,
}

impl SignalLogger {
    pub fn new(quiet: bool) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            count: AtomicU64::new(0),
            quiet,
        }
    }

    pub fn record(&self, event: &SignalEvent) {
        self.count.fetch_add(1, Ordering::Relaxed);

        let latency_us = event.latency().as_micros() as u64;
        if !self.quiet {
            info!(
                id = event.signal_id,
                kind = event.kind.as_str(),
                primary = %event.primary_symbol,
                secondary = event.secondary_symbol.map(|s| s.as_str()).unwrap_or(""),
                strength = event.signal_strength,
                confidence = event.confidence,
                latency_us,
                "signal"
            );
        }

        let row = SignalRow {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            signal_id: event.signal_id,
            kind: event.kind,
            primary_symbol: event.primary_symbol.as_str(),
            secondary_symbol: event.secondary_symbol.map(|s| s.as_str()),
            signal_strength: event.signal_strength,
            confidence: event.confidence,
            latency_us,
        };
        self.rows.lock().unwrap().push(row);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Snapshot of all recorded rows.
    pub fn rows(&self) -> Vec<SignalRow> {
        self.rows.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_data::Symbol;
    use std::time::Instant;

    #[test]
    fn test_record_keeps_rows_in_order() {
        let logger = SignalLogger::new(true);
        let symbol = Symbol::intern("SINK_TEST");
        let now = Instant::now();

        for id in 0..5u64 {
            logger.record(&SignalEvent {
                kind: SignalKind::ZScoreBreak,
                primary_symbol: symbol,
                secondary_symbol: None,
                signal_strength: 3.0,
                confidence: 0.95,
                event_time: now,
                generation_time: now,
                signal_id: id,
            });
        }

        assert_eq!(logger.count(), 5);
        let rows = logger.rows();
        assert_eq!(rows.len(), 5);
        assert!(rows.windows(2).all(|w| w[1].signal_id == w[0].signal_id + 1));
        assert_eq!(rows[0].primary_symbol, "SINK_TEST");
        assert_eq!(rows[0].secondary_symbol, None);
    }
}
