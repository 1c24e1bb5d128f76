//! Banded finite-difference operators on a tensor-product mesh.

use std::fmt::Debug;
use std::sync::Arc;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::Array;

use super::layout::FdmLinearOpLayout;
use super::meshers::FdmMesherComposite;

/// Three-point stencil weights `(lower, diag, upper)` of the first
/// derivative at each point along one direction.
fn first_derivative_weights(mesh: &FdmMesherComposite, direction: usize, index: usize) -> (Real, Real, Real) {
    let mesher = mesh.mesher(direction);
    let i = mesh.layout().coordinate(index, direction);
    match (mesher.dminus(i), mesher.dplus(i)) {
        (None, Some(hp)) => (0.0, -1.0 / hp, 1.0 / hp),
        (Some(hm), None) => (-1.0 / hm, 1.0 / hm, 0.0),
        (Some(hm), Some(hp)) => (
            -hp / (hm * (hm + hp)),
            (hp - hm) / (hm * hp),
            hm / (hp * (hm + hp)),
        ),
        (None, None) => (0.0, 0.0, 0.0),
    }
}

// ─── Triple band ──────────────────────────────────────────────────────────────

/// Tridiagonal operator along one direction of the mesh.
///
/// Row `i` couples point `i` to its neighbours along `direction`; rows at
/// the edge of the direction have a zero coefficient for the missing
/// neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleBandLinearOp {
    direction: usize,
    layout: Arc<FdmLinearOpLayout>,
    i0: Vec<usize>,
    i2: Vec<usize>,
    lower: Vec<Real>,
    diag: Vec<Real>,
    upper: Vec<Real>,
}

impl TripleBandLinearOp {
    /// The zero operator along `direction`.
    pub fn zero(direction: usize, layout: Arc<FdmLinearOpLayout>) -> Self {
        let n = layout.size();
        let i0 = (0..n).map(|i| layout.neighbour(i, direction, -1)).collect();
        let i2 = (0..n).map(|i| layout.neighbour(i, direction, 1)).collect();
        Self {
            direction,
            layout,
            i0,
            i2,
            lower: vec![0.0; n],
            diag: vec![0.0; n],
            upper: vec![0.0; n],
        }
    }

    /// Direction the operator acts along.
    pub fn direction(&self) -> usize {
        self.direction
    }

    /// Number of grid points.
    pub fn size(&self) -> usize {
        self.diag.len()
    }

    /// `y = Op·r`.
    pub fn apply(&self, r: &Array) -> Array {
        let r = r.as_slice();
        Array::from_fn(self.size(), |i| {
            self.lower[i] * r[self.i0[i]] + self.diag[i] * r[i] + self.upper[i] * r[self.i2[i]]
        })
    }

    /// Row scaling `diag(u)·Op`.
    pub fn mult(&self, u: &Array) -> Self {
        let mut out = self.clone();
        for (i, &s) in u.iter().enumerate() {
            out.lower[i] *= s;
            out.diag[i] *= s;
            out.upper[i] *= s;
        }
        out
    }

    /// `s·Op`.
    pub fn scale(&self, s: Real) -> Self {
        let mut out = self.clone();
        for band in [&mut out.lower, &mut out.diag, &mut out.upper] {
            band.iter_mut().for_each(|v| *v *= s);
        }
        out
    }

    /// `Op + other`; both must act along the same direction.
    pub fn add(&self, other: &Self) -> Result<Self> {
        ensure!(
            self.direction == other.direction && self.size() == other.size(),
            "cannot add operators along directions {} and {}",
            self.direction,
            other.direction
        );
        let mut out = self.clone();
        for i in 0..self.size() {
            out.lower[i] += other.lower[i];
            out.diag[i] += other.diag[i];
            out.upper[i] += other.upper[i];
        }
        Ok(out)
    }

    /// `Op + diag(u)`.
    pub fn add_diagonal(&self, u: &Array) -> Self {
        let mut out = self.clone();
        for (d, &v) in out.diag.iter_mut().zip(u.iter()) {
            *d += v;
        }
        out
    }

    /// `diag(a)·x + y + diag(b)`, with `None` standing for the identity
    /// scaling and the zero diagonal respectively.
    pub fn axpyb(a: Option<&Array>, x: &Self, y: &Self, b: Option<&Array>) -> Result<Self> {
        let scaled = match a {
            Some(a) => x.mult(a),
            None => x.clone(),
        };
        let sum = scaled.add(y)?;
        Ok(match b {
            Some(b) => sum.add_diagonal(b),
            None => sum,
        })
    }

    /// Solve `(b·I + a·Op)·x = r` line by line with the Thomas algorithm.
    pub fn solve_splitting(&self, r: &Array, a: Real, b: Real) -> Array {
        let n = self.layout.dims()[self.direction];
        let stride = self.layout.spacing()[self.direction];
        let mut x = r.clone();
        let out = x.as_mut_slice();
        let mut c_prime = vec![0.0; n];
        let mut d_prime = vec![0.0; n];
        for start in (0..self.size()).filter(|&i| self.layout.coordinate(i, self.direction) == 0) {
            let at = |k: usize| start + k * stride;
            let mut denom = b + a * self.diag[at(0)];
            c_prime[0] = a * self.upper[at(0)] / denom;
            d_prime[0] = r[at(0)] / denom;
            for k in 1..n {
                let i = at(k);
                let l = a * self.lower[i];
                denom = b + a * self.diag[i] - l * c_prime[k - 1];
                c_prime[k] = a * self.upper[i] / denom;
                d_prime[k] = (r[i] - l * d_prime[k - 1]) / denom;
            }
            out[at(n - 1)] = d_prime[n - 1];
            for k in (0..n - 1).rev() {
                out[at(k)] = d_prime[k] - c_prime[k] * out[at(k + 1)];
            }
        }
        x
    }
}

/// First derivative along `direction`: central on interior points,
/// one-sided on the edges.
#[derive(Debug, Clone)]
pub struct FirstDerivativeOp;

impl FirstDerivativeOp {
    /// The operator on `mesh`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(direction: usize, mesh: &FdmMesherComposite) -> TripleBandLinearOp {
        let mut op = TripleBandLinearOp::zero(direction, Arc::clone(mesh.layout()));
        for i in 0..op.size() {
            let (l, d, u) = first_derivative_weights(mesh, direction, i);
            op.lower[i] = l;
            op.diag[i] = d;
            op.upper[i] = u;
        }
        op
    }
}

/// Second derivative along `direction`, zero on the first and last points.
#[derive(Debug, Clone)]
pub struct SecondDerivativeOp;

impl SecondDerivativeOp {
    /// The operator on `mesh`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(direction: usize, mesh: &FdmMesherComposite) -> TripleBandLinearOp {
        let mut op = TripleBandLinearOp::zero(direction, Arc::clone(mesh.layout()));
        let mesher = mesh.mesher(direction);
        for i in 0..op.size() {
            let k = mesh.layout().coordinate(i, direction);
            if let (Some(hm), Some(hp)) = (mesher.dminus(k), mesher.dplus(k)) {
                op.lower[i] = 2.0 / (hm * (hm + hp));
                op.diag[i] = -2.0 / (hm * hp);
                op.upper[i] = 2.0 / (hp * (hm + hp));
            }
        }
        op
    }
}

// ─── Nine point ───────────────────────────────────────────────────────────────

/// Operator coupling each point to its 3×3 neighbourhood in two
/// directions, used for the mixed derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct NinePointLinearOp {
    directions: (usize, usize),
    layout: Arc<FdmLinearOpLayout>,
    // weights[i][3 * a + b]: offset a − 1 along the first direction,
    // b − 1 along the second
    weights: Vec<[Real; 9]>,
}

impl NinePointLinearOp {
    /// Mixed derivative `∂²/∂d0∂d1`.
    pub fn mixed_derivative(d0: usize, d1: usize, mesh: &FdmMesherComposite) -> Result<Self> {
        ensure!(d0 != d1, "mixed derivative needs two distinct directions");
        let weights = (0..mesh.layout().size())
            .map(|i| {
                let (l0, c0, u0) = first_derivative_weights(mesh, d0, i);
                let (l1, c1, u1) = first_derivative_weights(mesh, d1, i);
                let w0 = [l0, c0, u0];
                let w1 = [l1, c1, u1];
                let mut w = [0.0; 9];
                for a in 0..3 {
                    for b in 0..3 {
                        w[3 * a + b] = w0[a] * w1[b];
                    }
                }
                w
            })
            .collect();
        Ok(Self {
            directions: (d0, d1),
            layout: Arc::clone(mesh.layout()),
            weights,
        })
    }

    /// `y = Op·r`.
    pub fn apply(&self, r: &Array) -> Array {
        let (d0, d1) = self.directions;
        Array::from_fn(self.weights.len(), |i| {
            let mut sum = 0.0;
            for a in 0..3 {
                let j = self.layout.neighbour(i, d0, a as isize - 1);
                for b in 0..3 {
                    let w = self.weights[i][3 * a + b];
                    if w != 0.0 {
                        sum += w * r[self.layout.neighbour(j, d1, b as isize - 1)];
                    }
                }
            }
            sum
        })
    }

    /// Row scaling `diag(u)·Op`.
    pub fn mult(&self, u: &Array) -> Self {
        let mut out = self.clone();
        for (w, &s) in out.weights.iter_mut().zip(u.iter()) {
            w.iter_mut().for_each(|v| *v *= s);
        }
        out
    }
}

// ─── Composite ────────────────────────────────────────────────────────────────

/// Spatial operator of a PDE, split by direction for ADI schemes.
///
/// `apply` is the full operator `L`; `apply_direction(d)` is its part
/// `L_d` along `d` (without mixed terms) and `apply_mixed` the mixed
/// remainder, so that `L = Σ L_d + mixed`.
pub trait FdmLinearOpComposite: Debug + Send + Sync {
    /// Number of directions.
    fn size(&self) -> usize;

    /// Freeze time-dependent coefficients over `[t1, t2]`.
    fn set_time(&mut self, t1: Time, t2: Time) -> Result<()>;

    /// `L·r`.
    fn apply(&self, r: &Array) -> Array;

    /// Mixed-derivative part of `L·r`.
    fn apply_mixed(&self, r: &Array) -> Array;

    /// `L_direction·r`.
    fn apply_direction(&self, direction: usize, r: &Array) -> Array;

    /// Solve `(I + a·L_direction)·x = r`.
    fn solve_splitting(&self, direction: usize, r: &Array, a: Real) -> Array;

    /// Approximate inverse of `I − dt·L`, used to precondition implicit
    /// solves.
    fn preconditioner(&self, r: &Array, dt: Real) -> Array {
        self.solve_splitting(0, r, -dt)
    }
}
