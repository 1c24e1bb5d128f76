//! Recombining binomial trees.
//!
//! | kind | nodes | probabilities |
//! |---|---|---|
//! | Jarrow-Rudd | `x0·exp(i·μΔt + (2j−i)·σ√Δt)` | ½, ½ |
//! | Cox-Ross-Rubinstein | `x0·exp((2j−i)·σ√Δt)` | drift in probabilities |
//! | additive EQP | equal probabilities, variance-matched step | ½, ½ |
//! | Trigeorgis | equal jumps `√(σ²Δt + μ²Δt²)` | drift in probabilities |
//! | Tian | `x0·dⁱ⁻ʲ·uʲ`, three moments matched | moment-matched |
//! | Leisen-Reimer | strike-centred, Peizer-Pratt inversion | odd steps |
//! | Joshi | fourth-order correction to Leisen-Reimer | odd steps |

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};

use super::{LogNormalDynamics, RecombiningTree};

/// Binomial tree construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeKind {
    /// Equal probabilities, drift in the nodes.
    JarrowRudd,
    /// Equal jumps, drift in the probabilities.
    CoxRossRubinstein,
    /// Additive equal-probabilities tree.
    AdditiveEQP,
    /// Additive equal-jumps tree.
    Trigeorgis,
    /// Third-moment matching tree.
    Tian,
    /// Strike-centred tree with Peizer-Pratt inversion.
    LeisenReimer,
    /// Fourth-order Joshi tree.
    Joshi4,
}

#[derive(Debug, Clone, Copy)]
enum Nodes {
    /// `x0·exp(i·drift + (2j − i)·step)`
    Additive { drift: Real, step: Real },
    /// `x0·down^(i−j)·up^j`
    Multiplicative { up: Real, down: Real },
}

/// A recombining binomial tree with `i + 1` nodes at step `i`.
#[derive(Debug, Clone)]
pub struct BinomialTree {
    kind: TreeKind,
    x0: Real,
    dt: Time,
    steps: usize,
    nodes: Nodes,
    pu: Real,
}

impl BinomialTree {
    /// Build a tree of `kind` over `[0, end]`.
    ///
    /// Leisen-Reimer and Joshi trees centre on `strike` and round `steps`
    /// up to the next odd number.
    pub fn new(
        kind: TreeKind,
        dynamics: &LogNormalDynamics,
        end: Time,
        steps: usize,
        strike: Real,
    ) -> Result<Self> {
        ensure!(end > 0.0, "tree end time must be positive, got {end}");
        ensure!(steps > 0, "tree needs at least one step");
        let x0 = dynamics.spot;
        let steps = match kind {
            TreeKind::LeisenReimer | TreeKind::Joshi4 => steps | 1,
            _ => steps,
        };
        let dt = end / steps as Real;
        let drift_per_step = dynamics.drift * dt;
        let variance = dynamics.volatility * dynamics.volatility * dt;

        let (nodes, pu) = match kind {
            TreeKind::JarrowRudd => (
                Nodes::Additive {
                    drift: drift_per_step,
                    step: variance.sqrt(),
                },
                0.5,
            ),
            TreeKind::CoxRossRubinstein => {
                let dx = variance.sqrt();
                (
                    Nodes::Additive { drift: 0.0, step: dx },
                    0.5 + 0.5 * drift_per_step / dx,
                )
            }
            TreeKind::AdditiveEQP => {
                // equal probabilities: the log increment is drift ± step, so
                // its variance is step² exactly
                let step = variance.sqrt();
                ensure!(step > 0.0, "additive EQP tree needs a positive variance");
                (
                    Nodes::Additive {
                        drift: drift_per_step,
                        step,
                    },
                    0.5,
                )
            }
            TreeKind::Trigeorgis => {
                let dx = (variance + drift_per_step * drift_per_step).sqrt();
                (
                    Nodes::Additive { drift: 0.0, step: dx },
                    0.5 + 0.5 * drift_per_step / dx,
                )
            }
            TreeKind::Tian => {
                let q = variance.exp();
                let r = drift_per_step.exp() * q.sqrt();
                let root = (q * q + 2.0 * q - 3.0).sqrt();
                let up = 0.5 * r * q * (q + 1.0 + root);
                let down = 0.5 * r * q * (q + 1.0 - root);
                (Nodes::Multiplicative { up, down }, (r - down) / (up - down))
            }
            TreeKind::LeisenReimer | TreeKind::Joshi4 => {
                ensure!(strike > 0.0, "strike must be positive, got {strike}");
                let total_variance = dynamics.volatility * dynamics.volatility * end;
                let total_std = total_variance.sqrt();
                let ermqdt = (drift_per_step + 0.5 * total_variance / steps as Real).exp();
                let d2 = ((x0 / strike).ln() + drift_per_step * steps as Real) / total_std;
                let (pu, pdash) = if kind == TreeKind::LeisenReimer {
                    (
                        peizer_pratt_inversion(d2, steps),
                        peizer_pratt_inversion(d2 + total_std, steps),
                    )
                } else {
                    let k = (steps as Real - 1.0) / 2.0;
                    (joshi_up_probability(k, d2), joshi_up_probability(k, d2 + total_std))
                };
                let up = ermqdt * pdash / pu;
                let down = (ermqdt - pu * up) / (1.0 - pu);
                (Nodes::Multiplicative { up, down }, pu)
            }
        };
        ensure!(
            (0.0..=1.0).contains(&pu),
            "{kind:?} tree: probability {pu} outside [0, 1]; use more steps"
        );
        Ok(Self {
            kind,
            x0,
            dt,
            steps,
            nodes,
            pu,
        })
    }

    /// The construction used.
    pub fn kind(&self) -> TreeKind {
        self.kind
    }

    /// Probability of an up move.
    pub fn up_probability(&self) -> Real {
        self.pu
    }
}

impl RecombiningTree for BinomialTree {
    fn steps(&self) -> usize {
        self.steps
    }

    fn dt(&self) -> Time {
        self.dt
    }

    fn size(&self, i: usize) -> usize {
        i + 1
    }

    fn underlying(&self, i: usize, index: usize) -> Real {
        match self.nodes {
            Nodes::Additive { drift, step } => {
                let j = 2.0 * index as Real - i as Real;
                self.x0 * (i as Real * drift + j * step).exp()
            }
            Nodes::Multiplicative { up, down } => {
                self.x0 * down.powi((i - index) as i32) * up.powi(index as i32)
            }
        }
    }

    fn expectation(&self, _i: usize, index: usize, next: &[Real]) -> Real {
        self.pu * next[index + 1] + (1.0 - self.pu) * next[index]
    }
}

fn peizer_pratt_inversion(z: Real, n: usize) -> Real {
    let n = n as Real;
    let r = z / (n + 1.0 / 3.0 + 0.1 / (n + 1.0));
    let e = (-r * r * (n + 1.0 / 6.0)).exp();
    let sign = if z > 0.0 { 1.0 } else { -1.0 };
    0.5 + sign * (0.25 * (1.0 - e)).sqrt()
}

fn joshi_up_probability(k: Real, dj: Real) -> Real {
    let alpha = dj / 8.0_f64.sqrt();
    let alpha2 = alpha * alpha;
    let alpha3 = alpha * alpha2;
    let alpha5 = alpha3 * alpha2;
    let alpha7 = alpha5 * alpha2;
    let beta = -0.375 * alpha - alpha3;
    let gamma = (5.0 / 6.0) * alpha5 + (13.0 / 12.0) * alpha3 + (25.0 / 128.0) * alpha;
    let delta = -0.1025 * alpha - 0.9285 * alpha3 - 1.43 * alpha5 - 0.5 * alpha7;
    let rootk = k.sqrt();
    0.5 + alpha / rootk + beta / (k * rootk) + gamma / (k * k * rootk) + delta / (k * k * k * rootk)
}
