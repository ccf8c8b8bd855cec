//! Univariate streaming estimators.
//!
//! Three flavors of rolling mean/variance, each with O(1) updates:
//!
//! - `RunningStats`: unbounded history, Welford's algorithm
//! - `EmaStats`: exponentially decaying weights
//! - `WindowedStats`: fixed window over a circular buffer

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Online mean and variance over an unbounded stream (Welford's algorithm).
///
/// Maintains the running mean and the sum of squared deviations `m2`, which
/// stays well-conditioned for inputs far from zero where the naive
/// sum-of-squares form loses all precision.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunningStats {
    mean: f64,
    m2: f64,
    count: u64,
}

impl RunningStats {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an observation. O(1).
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Resets to the freshly constructed state.
    #[inline]
    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.m2 = 0.0;
        self.count = 0;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (Bessel's correction), 0 for fewer than two samples.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    /// Population variance, 0 when empty.
    #[inline]
    pub fn population_variance(&self) -> f64 {
        if self.count > 0 {
            self.m2 / self.count as f64
        } else {
            0.0
        }
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    #[inline]
    pub fn population_std_dev(&self) -> f64 {
        self.population_variance().sqrt()
    }

    /// Coefficient of variation, `std_dev / |mean|` (0 when the mean is 0).
    #[inline]
    pub fn cv(&self) -> f64 {
        if self.mean != 0.0 {
            self.std_dev() / self.mean.abs()
        } else {
            0.0
        }
    }

    /// Standard score of `value` against the current estimate (0 when the
    /// standard deviation is not positive).
    #[inline]
    pub fn z_score(&self, value: f64) -> f64 {
        let sd = self.std_dev();
        if sd > 0.0 {
            (value - self.mean) / sd
        } else {
            0.0
        }
    }

    /// True when at least one observation was added and the accumulators
    /// are finite.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.count > 0 && self.mean.is_finite() && self.m2.is_finite()
    }
}

/// Exponentially weighted mean and variance.
///
/// Seeded by the first observation; afterwards `mean += alpha * delta` and
/// `var = (1 - alpha) * (var + alpha * delta^2)`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmaStats {
    alpha: f64,
    mean: f64,
    var: f64,
    initialized: bool,
}

impl EmaStats {
    /// Creates an EMA equivalent to a window of `window` periods,
    /// `alpha = 2 / (window + 1)`.
    #[inline]
    pub fn new(window: usize) -> Self {
        Self::with_alpha(2.0 / (window as f64 + 1.0))
    }

    /// Creates an EMA with an explicit smoothing factor in `(0, 1]`.
    #[inline]
    pub fn with_alpha(alpha: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        Self {
            alpha,
            mean: 0.0,
            var: 0.0,
            initialized: false,
        }
    }

    /// Adds an observation. The first one seeds the mean with variance 0.
    #[inline]
    pub fn add(&mut self, value: f64) {
        if !self.initialized {
            self.mean = value;
            self.var = 0.0;
            self.initialized = true;
        } else {
            let delta = value - self.mean;
            self.mean += self.alpha * delta;
            self.var = (1.0 - self.alpha) * (self.var + self.alpha * delta * delta);
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.mean = 0.0;
        self.var = 0.0;
        self.initialized = false;
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.var
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.var.sqrt()
    }

    #[inline]
    pub fn z_score(&self, value: f64) -> f64 {
        let sd = self.std_dev();
        if sd > 0.0 {
            (value - self.mean) / sd
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

/// Mean and variance over the last `window` observations.
///
/// Circular buffer with incremental `sum` and `sum_sq`; the two-sum variance
/// form is fine here because the window is small and inputs are price-scale
/// bounded.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindowedStats {
    buffer: Vec<f64>,
    index: usize,
    count: usize,
    sum: f64,
    sum_sq: f64,
}

impl WindowedStats {
    /// Creates a window of the given size.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    #[inline]
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "window size must be positive");
        Self {
            buffer: vec![0.0; window],
            index: 0,
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Adds an observation, evicting the oldest once the window is full.
    #[inline]
    pub fn add(&mut self, value: f64) {
        if self.count >= self.buffer.len() {
            let old = self.buffer[self.index];
            self.sum -= old;
            self.sum_sq -= old * old;
        } else {
            self.count += 1;
        }

        self.buffer[self.index] = value;
        self.sum += value;
        self.sum_sq += value * value;
        self.index = (self.index + 1) % self.buffer.len();
    }

    #[inline]
    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.count = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    /// Number of observations currently in the window.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn window(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.count >= self.buffer.len()
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        if self.count > 0 {
            self.sum / self.count as f64
        } else {
            0.0
        }
    }

    /// Sample variance over the current fill, 0 for fewer than two samples.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.mean();
        (self.sum_sq - n * mean * mean) / (n - 1.0)
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.variance().max(0.0).sqrt()
    }

    #[inline]
    pub fn z_score(&self, value: f64) -> f64 {
        let sd = self.std_dev();
        if sd > 0.0 {
            (value - self.mean()) / sd
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_running_stats_known_values() {
        let mut stats = RunningStats::new();

        stats.add(5.0);
        assert!((stats.mean() - 5.0).abs() < EPSILON);
        assert_eq!(stats.variance(), 0.0);

        stats.add(7.0);
        assert!((stats.mean() - 6.0).abs() < EPSILON);
        assert!((stats.variance() - 2.0).abs() < EPSILON);

        stats.reset();
        for i in 1..=5 {
            stats.add(i as f64);
        }
        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < EPSILON);
        assert!((stats.variance() - 2.5).abs() < EPSILON);
        assert!((stats.std_dev() - 2.5f64.sqrt()).abs() < EPSILON);

        // (1 - 3) / sqrt(2.5) and its mirror
        assert!((stats.z_score(1.0) + 1.2649110640673518).abs() < EPSILON);
        assert!((stats.z_score(5.0) - 1.2649110640673518).abs() < EPSILON);
    }

    #[test]
    fn test_running_stats_matches_direct_formula() {
        let values = [3.25, -1.5, 0.0, 12.75, 7.125, -4.0, 2.5, 9.875];
        let mut stats = RunningStats::new();
        for &v in &values {
            stats.add(v);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);

        assert!((stats.mean() - mean).abs() < EPSILON);
        assert!((stats.variance() - var).abs() < EPSILON);
    }

    #[test]
    fn test_running_stats_numerical_stability() {
        let mut stats = RunningStats::new();
        let base = 1e12;
        for i in 0..1000 {
            stats.add(base + i as f64 * 0.001);
        }
        // Tiny spread on a huge base: the variance must survive.
        assert!(stats.variance() > 0.0);
        assert!(stats.variance() < 1.0);
        assert!(stats.is_valid());
    }

    #[test]
    fn test_running_stats_reset() {
        let mut stats = RunningStats::new();
        stats.add(10.0);
        stats.add(20.0);
        stats.reset();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.mean(), 0.0);
        assert_eq!(stats.variance(), 0.0);
        assert!(!stats.is_valid());
    }

    #[test]
    fn test_running_stats_degenerate_ratios() {
        let mut stats = RunningStats::new();
        for _ in 0..10 {
            stats.add(100.0);
        }
        // Zero variance: z-score and CV are defined to be 0.
        assert_eq!(stats.z_score(250.0), 0.0);
        assert!((stats.cv() - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_ema_recent_weighting() {
        let mut ema = EmaStats::new(10);
        for i in 1..=20 {
            ema.add(i as f64);
        }
        assert!(ema.is_initialized());
        // Recent observations dominate, so the EMA sits above the simple mean.
        assert!(ema.mean() > 10.0);
        assert!(ema.variance() > 0.0);
    }

    #[test]
    fn test_ema_seeding_and_reset() {
        let mut ema = EmaStats::with_alpha(0.5);
        assert!(!ema.is_initialized());

        ema.add(4.0);
        assert!(ema.is_initialized());
        assert_eq!(ema.mean(), 4.0);
        assert_eq!(ema.variance(), 0.0);
        assert_eq!(ema.z_score(10.0), 0.0);

        ema.add(8.0);
        assert!((ema.mean() - 6.0).abs() < EPSILON);

        ema.reset();
        assert!(!ema.is_initialized());
        assert_eq!(ema.mean(), 0.0);
    }

    #[test]
    fn test_windowed_eviction() {
        let mut windowed = WindowedStats::new(5);

        for i in 1..=5 {
            windowed.add(i as f64);
        }
        assert!(windowed.is_full());
        assert_eq!(windowed.count(), 5);
        assert!((windowed.mean() - 3.0).abs() < EPSILON);

        // [2, 3, 4, 5, 6]
        windowed.add(6.0);
        assert_eq!(windowed.count(), 5);
        assert!((windowed.mean() - 4.0).abs() < EPSILON);
        assert!((windowed.variance() - 2.5).abs() < EPSILON);
    }

    #[test]
    fn test_windowed_reset() {
        let mut windowed = WindowedStats::new(3);
        windowed.add(1.0);
        windowed.add(2.0);
        windowed.reset();
        assert_eq!(windowed.count(), 0);
        assert_eq!(windowed.mean(), 0.0);
        assert_eq!(windowed.variance(), 0.0);
        assert!(!windowed.is_full());
    }
}
