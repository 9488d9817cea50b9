//! Streaming mean/variance accumulation.
//!
//! Sufficient statistics are `(count, mean, M2)`. Single values are folded in
//! with Welford's update; two accumulators are combined with the pairwise
//! formula of Chan, Golub and LeVeque, so batch, incremental and sharded
//! learning all converge to the same moments.

use serde::{Deserialize, Serialize};

/// Divisor convention for variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceKind {
    /// `M2 / count`.
    Population,
    /// `M2 / (count - 1)` (Bessel-corrected).
    #[default]
    Sample,
}

impl VarianceKind {
    /// Minimum count for which the variance is defined.
    pub fn min_count(self) -> u64 {
        match self {
            VarianceKind::Population => 1,
            VarianceKind::Sample => 2,
        }
    }
}

impl std::fmt::Display for VarianceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarianceKind::Population => write!(f, "population"),
            VarianceKind::Sample => write!(f, "sample"),
        }
    }
}

/// Running `(count, mean, M2)` accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    /// Empty accumulator.
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Rebuild an accumulator from persisted sufficient statistics.
    ///
    /// Returns `None` when the parts are not a reachable state (non-finite
    /// moments, negative M2, or a non-zero mean on an empty accumulator).
    pub fn from_parts(count: u64, mean: f64, m2: f64) -> Option<Self> {
        if !mean.is_finite() || !m2.is_finite() || m2 < 0.0 {
            return None;
        }
        if count == 0 && (mean != 0.0 || m2 != 0.0) {
            return None;
        }
        Some(Self { count, mean, m2 })
    }

    /// Accumulate every value of a slice.
    pub fn from_slice(values: &[f64]) -> Self {
        let mut stats = Self::new();
        stats.extend(values.iter().copied());
        stats
    }

    /// Fold one value in (Welford update).
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Combine two accumulators as if all values had been pushed into one.
    pub fn merge(&self, other: &RunningStats) -> RunningStats {
        if other.count == 0 {
            return *self;
        }
        if self.count == 0 {
            return *other;
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let count = self.count + other.count;
        let n = count as f64;
        let delta = other.mean - self.mean;

        RunningStats {
            count,
            mean: self.mean + delta * (nb / n),
            m2: self.m2 + other.m2 + delta * delta * (na * nb / n),
        }
    }

    /// Number of values folded in.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean (0.0 when empty).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sum of squared differences from the mean.
    pub fn m2(&self) -> f64 {
        self.m2
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Variance under the given convention, `None` below its minimum count.
    pub fn variance(&self, kind: VarianceKind) -> Option<f64> {
        if self.count < kind.min_count() {
            return None;
        }
        let divisor = match kind {
            VarianceKind::Population => self.count as f64,
            VarianceKind::Sample => (self.count - 1) as f64,
        };
        // Rounding can leave M2 a hair below zero for constant input.
        Some((self.m2 / divisor).max(0.0))
    }

    /// Standard deviation under the given convention.
    pub fn std_dev(&self, kind: VarianceKind) -> Option<f64> {
        self.variance(kind).map(f64::sqrt)
    }
}

impl Extend<f64> for RunningStats {
    fn extend<I: IntoIterator<Item = f64>>(&mut self, iter: I) {
        for value in iter {
            self.push(value);
        }
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        stats.extend(iter);
        stats
    }
}
