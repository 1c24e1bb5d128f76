//! Time grids for trees, finite differences and path generation.

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};

const TIME_EPS: Real = 1e-10;

/// Increasing times starting at zero, containing every mandatory time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
    mandatory: Vec<Time>,
}

impl TimeGrid {
    /// `steps` equal steps on `[0, end]`.
    pub fn uniform(end: Time, steps: usize) -> Result<Self> {
        ensure!(end > 0.0, "time grid end must be positive, got {end}");
        ensure!(steps > 0, "time grid needs at least one step");
        let dt = end / steps as Real;
        let mut times: Vec<Time> = (0..=steps).map(|i| i as Real * dt).collect();
        times[steps] = end;
        Ok(Self {
            times,
            mandatory: vec![end],
        })
    }

    /// Grid through the positive `mandatory` times whose steps are no
    /// longer than `last / steps`.
    ///
    /// Each interval between consecutive mandatory times is split into the
    /// smallest number of equal steps satisfying the bound.
    pub fn with_mandatory_times(mandatory: &[Time], steps: usize) -> Result<Self> {
        ensure!(steps > 0, "time grid needs at least one step");
        ensure!(!mandatory.is_empty(), "no mandatory times given");
        ensure!(
            mandatory.iter().all(|&t| t >= 0.0 && t.is_finite()),
            "negative or non-finite mandatory time"
        );
        let mut points = mandatory.to_vec();
        points.sort_by(Real::total_cmp);
        points.dedup_by(|a, b| (*a - *b).abs() < TIME_EPS);
        let last = points[points.len() - 1];
        ensure!(last > 0.0, "mandatory times must include a positive time");
        let dt_max = last / steps as Real;

        let mut times = vec![0.0];
        let mut start = 0.0;
        for &end in points.iter().filter(|&&t| t > TIME_EPS) {
            let n = (((end - start) / dt_max) - 1e-9).ceil().max(1.0) as usize;
            let dt = (end - start) / n as Real;
            for i in 1..n {
                times.push(start + i as Real * dt);
            }
            times.push(end);
            start = end;
        }
        Ok(Self {
            times,
            mandatory: points,
        })
    }

    /// Number of time points.
    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Number of steps.
    pub fn steps(&self) -> usize {
        self.times.len() - 1
    }

    /// Time at index `i`.
    pub fn time(&self, i: usize) -> Time {
        self.times[i]
    }

    /// Length of step `i`, from `time(i)` to `time(i + 1)`.
    pub fn dt(&self, i: usize) -> Time {
        self.times[i + 1] - self.times[i]
    }

    /// All time points.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// The sorted mandatory times.
    pub fn mandatory_times(&self) -> &[Time] {
        &self.mandatory
    }

    /// Last time.
    pub fn end(&self) -> Time {
        self.times[self.times.len() - 1]
    }

    /// Index of the grid point closest to `t`.
    pub fn closest_index(&self, t: Time) -> usize {
        let pos = self.times.partition_point(|&x| x < t);
        if pos == 0 {
            0
        } else if pos == self.times.len() {
            pos - 1
        } else if t - self.times[pos - 1] <= self.times[pos] - t {
            pos - 1
        } else {
            pos
        }
    }

    /// Index of the grid point equal to `t`.
    pub fn index(&self, t: Time) -> Result<usize> {
        let i = self.closest_index(t);
        ensure!(
            (self.times[i] - t).abs() <= TIME_EPS.max(1e-12 * t.abs()),
            "time {t} is not on the grid (closest {})",
            self.times[i]
        );
        Ok(i)
    }
}
