//! Running statistics.
//!
//! [`IncrementalStatistics`] keeps weighted central moment sums up to the
//! fourth order and updates them in a numerically stable way.  Two
//! accumulators can be merged, which is how Monte Carlo batches simulated
//! on different threads are combined.

use ql_core::{ensure, errors::Result, Real};
use serde::{Deserialize, Serialize};

/// Weighted running moments of a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncrementalStatistics {
    samples: usize,
    weight: Real,
    mean: Real,
    m2: Real,
    m3: Real,
    m4: Real,
    min: Real,
    max: Real,
}

impl Default for IncrementalStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalStatistics {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self {
            samples: 0,
            weight: 0.0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: Real::INFINITY,
            max: Real::NEG_INFINITY,
        }
    }

    /// Discard all data.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Add one sample of unit weight.
    pub fn add(&mut self, x: Real) {
        self.add_weighted(x, 1.0);
    }

    /// Add one sample with the given non-negative weight.
    pub fn add_weighted(&mut self, x: Real, weight: Real) {
        let single = Self {
            samples: 1,
            weight,
            mean: x,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            min: x,
            max: x,
        };
        self.merge(&single);
    }

    /// Add every value of `data` with unit weight.
    pub fn add_sequence(&mut self, data: impl IntoIterator<Item = Real>) {
        for x in data {
            self.add(x);
        }
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        if other.samples == 0 {
            return;
        }
        if self.samples == 0 {
            *self = other.clone();
            return;
        }
        let (wa, wb) = (self.weight, other.weight);
        let w = wa + wb;
        let delta = other.mean - self.mean;
        let (d2, d3, d4) = (delta * delta, delta * delta * delta, delta * delta * delta * delta);

        let m4 = self.m4
            + other.m4
            + d4 * wa * wb * (wa * wa - wa * wb + wb * wb) / (w * w * w)
            + 6.0 * d2 * (wa * wa * other.m2 + wb * wb * self.m2) / (w * w)
            + 4.0 * delta * (wa * other.m3 - wb * self.m3) / w;
        let m3 = self.m3
            + other.m3
            + d3 * wa * wb * (wa - wb) / (w * w)
            + 3.0 * delta * (wa * other.m2 - wb * self.m2) / w;
        let m2 = self.m2 + other.m2 + d2 * wa * wb / w;

        self.mean += delta * wb / w;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.weight = w;
        self.samples += other.samples;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Number of samples added.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Sum of sample weights.
    pub fn weight_sum(&self) -> Real {
        self.weight
    }

    /// Weighted mean.
    pub fn mean(&self) -> Result<Real> {
        ensure!(self.weight > 0.0, "mean of an empty sample");
        Ok(self.mean)
    }

    /// Unbiased weighted variance.
    pub fn variance(&self) -> Result<Real> {
        ensure!(self.samples > 1, "variance needs at least two samples, got {}", self.samples);
        let n = self.samples as Real;
        Ok((self.m2 / self.weight * n / (n - 1.0)).max(0.0))
    }

    /// Square root of [`variance`][Self::variance].
    pub fn standard_deviation(&self) -> Result<Real> {
        Ok(self.variance()?.sqrt())
    }

    /// Standard error of the mean.
    pub fn error_estimate(&self) -> Result<Real> {
        Ok((self.variance()? / self.samples as Real).sqrt())
    }

    /// Adjusted Fisher-Pearson skewness.
    pub fn skewness(&self) -> Result<Real> {
        ensure!(self.samples > 2, "skewness needs at least three samples, got {}", self.samples);
        let n = self.samples as Real;
        let m2 = self.m2 / self.weight;
        if m2 == 0.0 {
            return Ok(0.0);
        }
        let g1 = self.m3 / self.weight / m2.powf(1.5);
        Ok((n * (n - 1.0)).sqrt() / (n - 2.0) * g1)
    }

    /// Sample excess kurtosis.
    pub fn kurtosis(&self) -> Result<Real> {
        ensure!(self.samples > 3, "kurtosis needs at least four samples, got {}", self.samples);
        let n = self.samples as Real;
        let m2 = self.m2 / self.weight;
        if m2 == 0.0 {
            return Ok(0.0);
        }
        let g2 = self.m4 / self.weight / (m2 * m2) - 3.0;
        Ok((n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0))
    }

    /// Smallest sample.
    pub fn min(&self) -> Result<Real> {
        ensure!(self.samples > 0, "min of an empty sample");
        Ok(self.min)
    }

    /// Largest sample.
    pub fn max(&self) -> Result<Real> {
        ensure!(self.samples > 0, "max of an empty sample");
        Ok(self.max)
    }
}

impl Extend<Real> for IncrementalStatistics {
    fn extend<I: IntoIterator<Item = Real>>(&mut self, iter: I) {
        self.add_sequence(iter);
    }
}

impl FromIterator<Real> for IncrementalStatistics {
    fn from_iter<I: IntoIterator<Item = Real>>(iter: I) -> Self {
        let mut stats = Self::new();
        stats.add_sequence(iter);
        stats
    }
}
