//! Recombining trees and backward induction.
//!
//! * [`BinomialTree`]: seven classical binomial constructions, selected by
//!   [`TreeKind`].
//! * [`TrinomialTree`]: a log-space trinomial tree with moment-matched
//!   branch probabilities.
//! * [`backward_induction`]: rolls a terminal payoff back to the root,
//!   with optional early exercise, keeping the first layers for Greeks.

pub mod binomial_tree;
pub mod trinomial_tree;

pub use binomial_tree::{BinomialTree, TreeKind};
pub use trinomial_tree::TrinomialTree;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};

/// Lognormal dynamics of the underlying with constant coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormalDynamics {
    /// Spot price.
    pub spot: Real,
    /// Drift of `ln S` per unit time, `r − q − σ²/2`.
    pub drift: Real,
    /// Volatility of `ln S`.
    pub volatility: Real,
}

impl LogNormalDynamics {
    /// Dynamics for rate `r`, dividend yield `q` and volatility `sigma`.
    pub fn new(spot: Real, r: Real, q: Real, sigma: Real) -> Result<Self> {
        ensure!(spot > 0.0, "spot must be positive, got {spot}");
        ensure!(sigma > 0.0, "volatility must be positive, got {sigma}");
        Ok(Self {
            spot,
            drift: r - q - 0.5 * sigma * sigma,
            volatility: sigma,
        })
    }
}

/// A recombining lattice of underlying prices.
pub trait RecombiningTree {
    /// Number of time steps.
    fn steps(&self) -> usize;

    /// Length of each step.
    fn dt(&self) -> Time;

    /// Number of nodes at step `i`.
    fn size(&self, i: usize) -> usize;

    /// Underlying price at node `index` of step `i`.
    fn underlying(&self, i: usize, index: usize) -> Real;

    /// Probability-weighted value of the descendants of node `index` at
    /// step `i`, given the values `next` at step `i + 1`.
    fn expectation(&self, i: usize, index: usize, next: &[Real]) -> Real;
}

/// Option values at the first three layers of a rolled-back tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSolution {
    layers: Vec<Vec<Real>>,
}

impl TreeSolution {
    /// Value at the root.
    pub fn value(&self) -> Real {
        self.layers[0][0]
    }

    /// Values at step `i`, for `i ≤ 2`.
    pub fn layer(&self, i: usize) -> &[Real] {
        &self.layers[i]
    }

    /// Delta and gamma from the nodes at steps one and two.
    pub fn delta_gamma<T: RecombiningTree + ?Sized>(&self, tree: &T) -> (Real, Real) {
        let s = |i, j| tree.underlying(i, j);
        let v1 = &self.layers[1];
        let v2 = &self.layers[2];
        let n1 = v1.len();
        let delta = (v1[n1 - 1] - v1[0]) / (s(1, n1 - 1) - s(1, 0));
        // one-sided deltas around the middle node of step two
        let mid = v2.len() / 2;
        let (lo, hi) = (mid - 1, mid + 1);
        let delta_up = (v2[hi] - v2[mid]) / (s(2, hi) - s(2, mid));
        let delta_down = (v2[mid] - v2[lo]) / (s(2, mid) - s(2, lo));
        let gamma = (delta_up - delta_down) / (0.5 * (s(2, hi) - s(2, lo)));
        (delta, gamma)
    }
}

/// Roll `payoff` back through `tree`.
///
/// `discount` is the one-step discount factor; at every step `i` for which
/// `exercisable(i)` holds, node values are floored at the payoff.
pub fn backward_induction<T, P, E>(
    tree: &T,
    discount: Real,
    payoff: P,
    exercisable: E,
) -> Result<TreeSolution>
where
    T: RecombiningTree + ?Sized,
    P: Fn(Real) -> Real,
    E: Fn(usize) -> bool,
{
    let n = tree.steps();
    ensure!(n >= 2, "backward induction needs at least two steps, got {n}");
    let mut values: Vec<Real> = (0..tree.size(n))
        .map(|j| payoff(tree.underlying(n, j)))
        .collect();
    let mut layers = vec![Vec::new(); 3];
    for i in (0..n).rev() {
        let next: Vec<Real> = (0..tree.size(i))
            .map(|j| {
                let hold = discount * tree.expectation(i, j, &values);
                if exercisable(i) {
                    hold.max(payoff(tree.underlying(i, j)))
                } else {
                    hold
                }
            })
            .collect();
        values = next;
        if i <= 2 {
            layers[i] = values.clone();
        }
    }
    Ok(TreeSolution { layers })
}
