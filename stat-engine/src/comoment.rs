//! Bivariate streaming estimators.
//!
//! One-pass covariance via a running comoment, parallel to Welford's
//! algorithm, plus an exponentially weighted variant.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Online covariance, correlation, and regression slope over a pair stream.
///
/// Maintains per-axis means and squared-deviation sums together with the
/// comoment `c = sum((x - mean_x) * (y - mean_y))`, updated in one pass.
/// The cross terms use the post-update means; that is what keeps the
/// accumulators well-conditioned.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Covariance {
    mean_x: f64,
    mean_y: f64,
    c: f64,
    m2_x: f64,
    m2_y: f64,
    count: u64,
}

impl Covariance {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair of observations. O(1).
    #[inline]
    pub fn add(&mut self, x: f64, y: f64) {
        self.count += 1;
        let n = self.count as f64;

        let dx = x - self.mean_x;
        let dy = y - self.mean_y;

        self.mean_x += dx / n;
        self.mean_y += dy / n;

        self.c += dx * (y - self.mean_y);
        self.m2_x += dx * (x - self.mean_x);
        self.m2_y += dy * (y - self.mean_y);
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    pub fn mean_x(&self) -> f64 {
        self.mean_x
    }

    #[inline]
    pub fn mean_y(&self) -> f64 {
        self.mean_y
    }

    /// Sample covariance, 0 for fewer than two pairs.
    #[inline]
    pub fn covariance(&self) -> f64 {
        if self.count > 1 {
            self.c / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    /// Population covariance, 0 when empty.
    #[inline]
    pub fn population_covariance(&self) -> f64 {
        if self.count > 0 {
            self.c / self.count as f64
        } else {
            0.0
        }
    }

    #[inline]
    pub fn variance_x(&self) -> f64 {
        if self.count > 1 {
            self.m2_x / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    #[inline]
    pub fn variance_y(&self) -> f64 {
        if self.count > 1 {
            self.m2_y / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    #[inline]
    pub fn std_dev_x(&self) -> f64 {
        self.variance_x().sqrt()
    }

    #[inline]
    pub fn std_dev_y(&self) -> f64 {
        self.variance_y().sqrt()
    }

    /// Pearson correlation coefficient (0 if either variance is not positive).
    #[inline]
    pub fn correlation(&self) -> f64 {
        let var_x = self.variance_x();
        let var_y = self.variance_y();
        if var_x <= 0.0 || var_y <= 0.0 {
            return 0.0;
        }
        self.covariance() / (var_x * var_y).sqrt()
    }

    /// Regression slope of y on x (0 if `variance_x` is not positive).
    #[inline]
    pub fn beta(&self) -> f64 {
        let var_x = self.variance_x();
        if var_x > 0.0 {
            self.covariance() / var_x
        } else {
            0.0
        }
    }

    /// Coefficient of determination.
    #[inline]
    pub fn r_squared(&self) -> f64 {
        let corr = self.correlation();
        corr * corr
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.count > 0
            && self.mean_x.is_finite()
            && self.mean_y.is_finite()
            && self.c.is_finite()
            && self.m2_x.is_finite()
            && self.m2_y.is_finite()
    }
}

/// Exponentially weighted covariance for faster decay.
///
/// The first pair jointly seeds both means; afterwards the means, the
/// covariance, and both variances decay with the same smoothing factor.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmaCovariance {
    alpha: f64,
    mean_x: f64,
    mean_y: f64,
    cov: f64,
    var_x: f64,
    var_y: f64,
    initialized: bool,
}

impl EmaCovariance {
    /// Creates an EMA covariance equivalent to a window of `window` periods.
    #[inline]
    pub fn new(window: usize) -> Self {
        Self::with_alpha(2.0 / (window as f64 + 1.0))
    }

    /// Creates an EMA covariance with an explicit smoothing factor in `(0, 1]`.
    #[inline]
    pub fn with_alpha(alpha: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0);
        Self {
            alpha,
            mean_x: 0.0,
            mean_y: 0.0,
            cov: 0.0,
            var_x: 0.0,
            var_y: 0.0,
            initialized: false,
        }
    }

    /// Adds a pair of observations.
    #[inline]
    pub fn add(&mut self, x: f64, y: f64) {
        if !self.initialized {
            self.mean_x = x;
            self.mean_y = y;
            self.cov = 0.0;
            self.var_x = 0.0;
            self.var_y = 0.0;
            self.initialized = true;
        } else {
            let dx = x - self.mean_x;
            let dy = y - self.mean_y;

            self.mean_x += self.alpha * dx;
            self.mean_y += self.alpha * dy;

            self.cov = (1.0 - self.alpha) * self.cov + self.alpha * dx * dy;
            self.var_x = (1.0 - self.alpha) * self.var_x + self.alpha * dx * dx;
            self.var_y = (1.0 - self.alpha) * self.var_y + self.alpha * dy * dy;
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.mean_x = 0.0;
        self.mean_y = 0.0;
        self.cov = 0.0;
        self.var_x = 0.0;
        self.var_y = 0.0;
        self.initialized = false;
    }

    #[inline]
    pub fn mean_x(&self) -> f64 {
        self.mean_x
    }

    #[inline]
    pub fn mean_y(&self) -> f64 {
        self.mean_y
    }

    #[inline]
    pub fn covariance(&self) -> f64 {
        self.cov
    }

    #[inline]
    pub fn variance_x(&self) -> f64 {
        self.var_x
    }

    #[inline]
    pub fn variance_y(&self) -> f64 {
        self.var_y
    }

    #[inline]
    pub fn correlation(&self) -> f64 {
        if self.var_x <= 0.0 || self.var_y <= 0.0 {
            return 0.0;
        }
        self.cov / (self.var_x * self.var_y).sqrt()
    }

    #[inline]
    pub fn beta(&self) -> f64 {
        if self.var_x > 0.0 {
            self.cov / self.var_x
        } else {
            0.0
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
