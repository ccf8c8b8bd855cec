//! Signal rules.
//!
//! A rule consumes observations through its `add_*` method and, when
//! queried, reports whether its firing condition holds and how strongly.
//! Evaluation takes `&self` and never mutates rule state; during warmup a
//! rule reports `fires = false` with strength 0, and `reset` restarts the
//! warmup.

use stat_engine::{Covariance, EmaStats, RunningStats};

/// Default z-score breakout threshold.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.5;
/// Default correlation breakdown threshold.
pub const DEFAULT_CORRELATION_THRESHOLD: f64 = 0.3;
/// Default minimum pair observations before correlation is trusted.
pub const DEFAULT_MIN_PAIR_OBSERVATIONS: u64 = 50;
/// Default volume spike threshold.
pub const DEFAULT_VOLUME_THRESHOLD: f64 = 3.0;
/// Default fast/slow EMA windows for mean reversion.
pub const DEFAULT_MEAN_REVERSION_WINDOWS: (usize, usize) = (10, 50);
/// Default mean reversion divergence threshold.
pub const DEFAULT_MEAN_REVERSION_THRESHOLD: f64 = 2.0;

const ZSCORE_WARMUP: u64 = 10;
const VOLUME_WARMUP: u64 = 20;

/// Outcome of querying a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub fires: bool,
    /// Signed strength; 0 during warmup or under degenerate variance.
    pub strength: f64,
}

impl Evaluation {
    /// A non-firing evaluation with zero strength.
    #[inline]
    pub const fn quiet() -> Self {
        Self {
            fires: false,
            strength: 0.0,
        }
    }
}

/// Common surface of all signal rules.
pub trait SignalRule {
    /// Reports the current firing state without mutating the rule.
    fn evaluate(&self) -> Evaluation;

    /// Clears accumulated state; warmup restarts.
    fn reset(&mut self);

    /// Short rule name for logs and diagnostics.
    fn name(&self) -> &'static str;
}

/// Z-score breakout: fires when the latest observation sits at least
/// `threshold` standard deviations away from the running mean.
#[derive(Debug, Clone)]
pub struct ZScoreRule {
    stats: RunningStats,
    threshold: f64,
    last_value: f64,
    has_value: bool,
}

impl ZScoreRule {
    #[inline]
    pub fn new(threshold: f64) -> Self {
        Self {
            stats: RunningStats::new(),
            threshold,
            last_value: 0.0,
            has_value: false,
        }
    }

    #[inline]
    pub fn add_observation(&mut self, value: f64) {
        self.stats.add(value);
        self.last_value = value;
        self.has_value = true;
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.stats.count()
    }
}

impl Default for ZScoreRule {
    fn default() -> Self {
        Self::new(DEFAULT_ZSCORE_THRESHOLD)
    }
}

impl SignalRule for ZScoreRule {
    fn evaluate(&self) -> Evaluation {
        if !self.has_value || self.stats.count() < ZSCORE_WARMUP {
            return Evaluation::quiet();
        }
        let strength = self.stats.z_score(self.last_value);
        Evaluation {
            fires: strength.abs() >= self.threshold,
            strength,
        }
    }

    fn reset(&mut self) {
        self.stats.reset();
        self.last_value = 0.0;
        self.has_value = false;
    }

    fn name(&self) -> &'static str {
        "ZScore"
    }
}

/// Volume spike: fires on the positive tail only. A collapse in trade size
/// is not a spike.
#[derive(Debug, Clone)]
pub struct VolumeRule {
    stats: RunningStats,
    threshold: f64,
    last_volume: f64,
    has_volume: bool,
}

impl VolumeRule {
    #[inline]
    pub fn new(threshold: f64) -> Self {
        Self {
            stats: RunningStats::new(),
            threshold,
            last_volume: 0.0,
            has_volume: false,
        }
    }

    #[inline]
    pub fn add_volume(&mut self, volume: f64) {
        self.stats.add(volume);
        self.last_volume = volume;
        self.has_volume = true;
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.stats.count()
    }
}

impl Default for VolumeRule {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME_THRESHOLD)
    }
}

impl SignalRule for VolumeRule {
    fn evaluate(&self) -> Evaluation {
        if !self.has_volume || self.stats.count() < VOLUME_WARMUP {
            return Evaluation::quiet();
        }
        let strength = self.stats.z_score(self.last_volume);
        Evaluation {
            fires: strength >= self.threshold,
            strength,
        }
    }

    fn reset(&mut self) {
        self.stats.reset();
        self.last_volume = 0.0;
        self.has_volume = false;
    }

    fn name(&self) -> &'static str {
        "Volume"
    }
}

/// Mean reversion: fires when the fast EMA has diverged from the slow EMA
/// by at least `threshold` fast standard deviations.
#[derive(Debug, Clone)]
pub struct MeanReversionRule {
    fast_ema: EmaStats,
    slow_ema: EmaStats,
    threshold: f64,
    has_value: bool,
}

impl MeanReversionRule {
    #[inline]
    pub fn new(fast_window: usize, slow_window: usize, threshold: f64) -> Self {
        Self {
            fast_ema: EmaStats::new(fast_window),
            slow_ema: EmaStats::new(slow_window),
            threshold,
            has_value: false,
        }
    }

    #[inline]
    pub fn add_observation(&mut self, value: f64) {
        self.fast_ema.add(value);
        self.slow_ema.add(value);
        self.has_value = true;
    }
}

impl Default for MeanReversionRule {
    fn default() -> Self {
        let (fast, slow) = DEFAULT_MEAN_REVERSION_WINDOWS;
        Self::new(fast, slow, DEFAULT_MEAN_REVERSION_THRESHOLD)
    }
}

impl SignalRule for MeanReversionRule {
    fn evaluate(&self) -> Evaluation {
        if !self.has_value
            || !self.fast_ema.is_initialized()
            || !self.slow_ema.is_initialized()
        {
            return Evaluation::quiet();
        }

        let fast_std = self.fast_ema.std_dev();
        if fast_std <= 0.0 {
            return Evaluation::quiet();
        }

        // Divergence of the fast mean from the slow, in fast-σ units.
        let strength = (self.fast_ema.mean() - self.slow_ema.mean()) / fast_std;
        Evaluation {
            fires: strength.abs() >= self.threshold,
            strength,
        }
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.has_value = false;
    }

    fn name(&self) -> &'static str {
        "MeanRev"
    }
}

/// Correlation breakdown: fires once two historically co-moving series have
/// lost their linear relationship (|correlation| below the threshold).
#[derive(Debug, Clone)]
pub struct CorrelationBreakRule {
    covar: Covariance,
    correlation_threshold: f64,
    min_observations: u64,
}

impl CorrelationBreakRule {
    #[inline]
    pub fn new(correlation_threshold: f64, min_observations: u64) -> Self {
        Self {
            covar: Covariance::new(),
            correlation_threshold,
            min_observations,
        }
    }

    #[inline]
    pub fn add_pair(&mut self, x: f64, y: f64) {
        self.covar.add(x, y);
    }

    #[inline]
    pub fn correlation(&self) -> f64 {
        self.covar.correlation()
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        self.covar.beta()
    }

    #[inline]
    pub fn observations(&self) -> u64 {
        self.covar.count()
    }
}

impl Default for CorrelationBreakRule {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_THRESHOLD, DEFAULT_MIN_PAIR_OBSERVATIONS)
    }
}

impl SignalRule for CorrelationBreakRule {
    fn evaluate(&self) -> Evaluation {
        if self.covar.count() < self.min_observations {
            return Evaluation::quiet();
        }
        let corr = self.covar.correlation();
        Evaluation {
            fires: corr.abs() < self.correlation_threshold,
            strength: corr,
        }
    }

    fn reset(&mut self) {
        self.covar.reset();
    }

    fn name(&self) -> &'static str {
        "CorrBreak"
    }
}
