//! Lock-free latency histogram.
//!
//! Fixed microsecond buckets with atomic counters, usable concurrently from
//! the consumer thread (writes) and any number of observer threads (reads).
//! Readers see eventually-consistent snapshots. Percentiles are bucketed
//! approximations with linear interpolation inside the selected bucket.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

/// Bucket edges in microseconds; bucket `i` covers `[EDGES[i], EDGES[i+1])`.
pub const BUCKET_EDGES_US: [u64; NUM_BUCKETS + 1] = [
    0, 50, 100, 250, 500, 1000, 2000, 5000, 10000, 50000, 1_000_000,
];

const NUM_BUCKETS: usize = 10;

/// One bucket of a histogram snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    pub lower_bound_us: u64,
    pub upper_bound_us: u64,
    pub count: u64,
    pub percentage: f64,
}

/// Concurrent bucketed latency and throughput accounting.
pub struct LatencyHistogram {
    buckets: [AtomicU64; NUM_BUCKETS],
    total_samples: AtomicU64,
    total_latency_us: AtomicU64,
    min_latency_us: AtomicU64,
    max_latency_us: AtomicU64,
    // Anchor for the rate computation, written by whichever thread records
    // the first sample.
    timing_started: AtomicBool,
    start_time: Mutex<Option<Instant>>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            buckets: [const { AtomicU64::new(0) }; NUM_BUCKETS],
            total_samples: AtomicU64::new(0),
            total_latency_us: AtomicU64::new(0),
            min_latency_us: AtomicU64::new(u64::MAX),
            max_latency_us: AtomicU64::new(0),
            timing_started: AtomicBool::new(false),
            start_time: Mutex::new(None),
        }
    }

    /// Records the latency between two monotonic time points.
    #[inline]
    pub fn add_sample(&self, start: Instant, end: Instant) {
        let latency_us = end.saturating_duration_since(start).as_micros() as u64;
        self.add_sample_us(latency_us);
    }

    /// Records a latency in microseconds.
    pub fn add_sample_us(&self, latency_us: u64) {
        if !self.timing_started.swap(true, Ordering::AcqRel) {
            *self.start_time.lock().unwrap() = Some(Instant::now());
        }

        let bucket = BUCKET_EDGES_US[1..]
            .iter()
            .position(|&edge| latency_us < edge)
            .unwrap_or(NUM_BUCKETS - 1);

        self.buckets[bucket].fetch_add(1, Ordering::Relaxed);
        self.total_samples.fetch_add(1, Ordering::Relaxed);
        self.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.min_latency_us.fetch_min(latency_us, Ordering::Relaxed);
        self.max_latency_us.fetch_max(latency_us, Ordering::Relaxed);
    }

    /// Clears all counters; the rate anchor restarts at the next sample.
    pub fn reset(&self) {
        for bucket in &self.buckets {
            bucket.store(0, Ordering::Relaxed);
        }
        self.total_samples.store(0, Ordering::Relaxed);
        self.total_latency_us.store(0, Ordering::Relaxed);
        self.min_latency_us.store(u64::MAX, Ordering::Relaxed);
        self.max_latency_us.store(0, Ordering::Relaxed);
        *self.start_time.lock().unwrap() = None;
        self.timing_started.store(false, Ordering::Release);
    }

    #[inline]
    pub fn total_samples(&self) -> u64 {
        self.total_samples.load(Ordering::Acquire)
    }

    pub fn mean_latency_us(&self) -> f64 {
        let total = self.total_samples();
        if total > 0 {
            self.total_latency_us.load(Ordering::Acquire) as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Smallest recorded latency, 0 when empty.
    pub fn min_latency_us(&self) -> u64 {
        let min = self.min_latency_us.load(Ordering::Acquire);
        if min == u64::MAX {
            0
        } else {
            min
        }
    }

    pub fn max_latency_us(&self) -> u64 {
        self.max_latency_us.load(Ordering::Acquire)
    }

    /// Approximate percentile in microseconds.
    ///
    /// Cumulative scan over the buckets with linear interpolation inside the
    /// bucket containing the target rank; interpolation may land on a
    /// bucket's upper edge.
    pub fn percentile_us(&self, p: f64) -> f64 {
        let total = self.total_samples();
        if total == 0 {
            return 0.0;
        }

        let target = (total as f64 * p / 100.0) as u64;
        let mut cumulative = 0u64;

        for i in 0..NUM_BUCKETS {
            let count = self.buckets[i].load(Ordering::Acquire);
            cumulative += count;
            if cumulative >= target {
                let lower = BUCKET_EDGES_US[i] as f64;
                let upper = BUCKET_EDGES_US[i + 1] as f64;
                if count == 0 {
                    return lower;
                }
                let before = cumulative - count;
                let position = (target - before) as f64 / count as f64;
                return lower + position * (upper - lower);
            }
        }

        BUCKET_EDGES_US[NUM_BUCKETS] as f64
    }

    pub fn p50_us(&self) -> f64 {
        self.percentile_us(50.0)
    }

    pub fn p95_us(&self) -> f64 {
        self.percentile_us(95.0)
    }

    pub fn p99_us(&self) -> f64 {
        self.percentile_us(99.0)
    }

    /// Samples per second since the first recorded sample.
    pub fn samples_per_second(&self) -> f64 {
        if !self.timing_started.load(Ordering::Acquire) {
            return 0.0;
        }
        let start = match *self.start_time.lock().unwrap() {
            Some(start) => start,
            None => return 0.0,
        };
        let elapsed_us = start.elapsed().as_micros();
        if elapsed_us == 0 {
            return 0.0;
        }
        self.total_samples() as f64 * 1_000_000.0 / elapsed_us as f64
    }

    /// Snapshot of every bucket with counts and percentages.
    pub fn snapshot(&self) -> Vec<BucketSnapshot> {
        let total = self.total_samples();
        (0..NUM_BUCKETS)
            .map(|i| {
                let count = self.buckets[i].load(Ordering::Acquire);
                let percentage = if total > 0 {
                    count as f64 * 100.0 / total as f64
                } else {
                    0.0
                };
                BucketSnapshot {
                    lower_bound_us: BUCKET_EDGES_US[i],
                    upper_bound_us: BUCKET_EDGES_US[i + 1],
                    count,
                    percentage,
                }
            })
            .collect()
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_bucketization() {
        let hist = LatencyHistogram::new();
        for us in [10, 75, 300, 1500] {
            hist.add_sample_us(us);
        }

        let snapshot = hist.snapshot();
        assert_eq!(snapshot[0].count, 1); // [0, 50)
        assert_eq!(snapshot[1].count, 1); // [50, 100)
        assert_eq!(snapshot[2].count, 0); // [100, 250)
        assert_eq!(snapshot[3].count, 1); // [250, 500)
        assert_eq!(snapshot[5].count, 1); // [1000, 2000)

        assert_eq!(hist.total_samples(), 4);
        assert!((hist.mean_latency_us() - 471.25).abs() < 1e-9);
        assert_eq!(hist.min_latency_us(), 10);
        assert_eq!(hist.max_latency_us(), 1500);

        // The median rank falls in the [50, 100) bucket; interpolation may
        // touch the upper edge.
        let p50 = hist.p50_us();
        assert!((50.0..=100.0).contains(&p50));
    }

    #[test]
    fn test_overflow_sample_lands_in_last_bucket() {
        let hist = LatencyHistogram::new();
        hist.add_sample_us(5_000_000);
        assert_eq!(hist.snapshot()[9].count, 1);
        assert_eq!(hist.max_latency_us(), 5_000_000);
    }

    #[test]
    fn test_percentile_monotonicity() {
        let hist = LatencyHistogram::new();
        // A spread across several buckets.
        for us in [5, 20, 60, 90, 120, 400, 800, 1800, 7000, 40000] {
            hist.add_sample_us(us);
        }

        let p50 = hist.p50_us();
        let p95 = hist.p95_us();
        let p99 = hist.p99_us();
        assert!(p50 <= p95);
        assert!(p95 <= p99);
        assert!(p99 <= hist.max_latency_us() as f64 + 1e-9);

        let mean = hist.mean_latency_us();
        assert!(hist.min_latency_us() as f64 <= mean);
        assert!(mean <= hist.max_latency_us() as f64);
    }

    #[test]
    fn test_instant_pair_sampling_and_rate() {
        let hist = LatencyHistogram::new();
        let start = Instant::now();
        hist.add_sample(start, start + Duration::from_micros(120));
        assert_eq!(hist.total_samples(), 1);
        assert_eq!(hist.snapshot()[2].count, 1); // [100, 250)
        assert!(hist.samples_per_second() > 0.0);
    }

    #[test]
    fn test_reset() {
        let hist = LatencyHistogram::new();
        hist.add_sample_us(100);
        hist.add_sample_us(200);
        hist.reset();
        assert_eq!(hist.total_samples(), 0);
        assert_eq!(hist.min_latency_us(), 0);
        assert_eq!(hist.max_latency_us(), 0);
        assert_eq!(hist.samples_per_second(), 0.0);
        assert!(hist.snapshot().iter().all(|b| b.count == 0));
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;

        let hist = Arc::new(LatencyHistogram::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let hist = Arc::clone(&hist);
                std::thread::spawn(move || {
                    for i in 0..1000u64 {
                        hist.add_sample_us(t * 100 + i % 50);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(hist.total_samples(), 4000);
        let counted: u64 = hist.snapshot().iter().map(|b| b.count).sum();
        assert_eq!(counted, 4000);
    }
}
