//! Log-space trinomial tree.

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};

use super::{LogNormalDynamics, RecombiningTree};

/// Trinomial tree on `ln S` with spacing `σ√(3Δt)`.
///
/// Step `i` has `2i + 1` nodes; node `j` branches to nodes `j`, `j + 1` and
/// `j + 2` of the next step.  Branch probabilities match the first two
/// moments of the log-return.
#[derive(Debug, Clone)]
pub struct TrinomialTree {
    x0: Real,
    dx: Real,
    dt: Time,
    steps: usize,
    pu: Real,
    pm: Real,
    pd: Real,
}

impl TrinomialTree {
    /// Build a tree of `steps` steps over `[0, end]`.
    pub fn new(dynamics: &LogNormalDynamics, end: Time, steps: usize) -> Result<Self> {
        ensure!(end > 0.0, "tree end time must be positive, got {end}");
        ensure!(steps > 0, "tree needs at least one step");
        let dt = end / steps as Real;
        let sigma = dynamics.volatility;
        let nu = dynamics.drift;
        let dx = sigma * (3.0 * dt).sqrt();
        let second_moment = (sigma * sigma * dt + nu * nu * dt * dt) / (dx * dx);
        let first_moment = nu * dt / dx;
        let pu = 0.5 * (second_moment + first_moment);
        let pd = 0.5 * (second_moment - first_moment);
        let pm = 1.0 - pu - pd;
        ensure!(
            pu >= 0.0 && pm >= 0.0 && pd >= 0.0,
            "negative trinomial probability ({pu}, {pm}, {pd}); use more steps"
        );
        Ok(Self {
            x0: dynamics.spot,
            dx,
            dt,
            steps,
            pu,
            pm,
            pd,
        })
    }

    /// Up, middle and down probabilities.
    pub fn probabilities(&self) -> (Real, Real, Real) {
        (self.pu, self.pm, self.pd)
    }

    /// Log-space node spacing.
    pub fn dx(&self) -> Real {
        self.dx
    }
}

impl RecombiningTree for TrinomialTree {
    fn steps(&self) -> usize {
        self.steps
    }

    fn dt(&self) -> Time {
        self.dt
    }

    fn size(&self, i: usize) -> usize {
        2 * i + 1
    }

    fn underlying(&self, i: usize, index: usize) -> Real {
        let j = index as Real - i as Real;
        self.x0 * (j * self.dx).exp()
    }

    fn expectation(&self, _i: usize, index: usize, next: &[Real]) -> Real {
        self.pd * next[index] + self.pm * next[index + 1] + self.pu * next[index + 2]
    }
}
