//! Backward rollback and extraction of results from the solution grid.

use serde::{Deserialize, Serialize};
use tracing::trace;

use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real, Time};
use ql_math::interpolations::{BilinearInterpolation, CubicNaturalSpline, Interpolation};
use ql_math::Array;

use super::boundary::FdmBoundaryConditionSet;
use super::operators::FdmLinearOpComposite;
use super::schemes::FdmSchemeDesc;
use super::step_conditions::{CompositeStepCondition, StepCondition};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Grid sizes and scheme of a finite-difference engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdConfig {
    /// Time steps.
    pub t_grid: usize,
    /// Spot grid points.
    pub x_grid: usize,
    /// Variance grid points (two-factor models).
    pub v_grid: usize,
    /// Implicit Euler steps taken before the main scheme.
    pub damping_steps: usize,
    /// Time-stepping scheme.
    pub scheme: FdmSchemeDesc,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            t_grid: 100,
            x_grid: 100,
            v_grid: 50,
            damping_steps: 0,
            scheme: FdmSchemeDesc::default(),
        }
    }
}

impl FdConfig {
    /// Set the number of time steps.
    pub fn with_t_grid(mut self, t_grid: usize) -> Self {
        self.t_grid = t_grid;
        self
    }

    /// Set the number of spot grid points.
    pub fn with_x_grid(mut self, x_grid: usize) -> Self {
        self.x_grid = x_grid;
        self
    }

    /// Set the number of variance grid points.
    pub fn with_v_grid(mut self, v_grid: usize) -> Self {
        self.v_grid = v_grid;
        self
    }

    /// Set the number of damping steps.
    pub fn with_damping_steps(mut self, damping_steps: usize) -> Self {
        self.damping_steps = damping_steps;
        self
    }

    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: FdmSchemeDesc) -> Self {
        self.scheme = scheme;
        self
    }

    /// Check the grid sizes.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.t_grid >= 2, "at least two time steps needed, got {}", self.t_grid);
        ensure!(self.x_grid >= 4, "at least four spot points needed, got {}", self.x_grid);
        ensure!(self.v_grid >= 4, "at least four variance points needed, got {}", self.v_grid);
        Ok(())
    }
}

// ─── Rollback ─────────────────────────────────────────────────────────────────

/// Rolls a terminal condition back in time, stopping exactly at the step
/// conditions' stopping times.
#[derive(Debug)]
pub struct FdmBackwardSolver {
    op: Box<dyn FdmLinearOpComposite>,
    bc: FdmBoundaryConditionSet,
    condition: CompositeStepCondition,
    stopping_times: Vec<Time>,
    scheme: FdmSchemeDesc,
}

impl FdmBackwardSolver {
    /// Solver for `op` with boundary conditions `bc` and step `condition`.
    pub fn new(
        op: Box<dyn FdmLinearOpComposite>,
        bc: FdmBoundaryConditionSet,
        condition: CompositeStepCondition,
        scheme: FdmSchemeDesc,
    ) -> Self {
        let stopping_times = condition.stopping_times();
        Self {
            op,
            bc,
            condition,
            stopping_times,
            scheme,
        }
    }

    /// Roll `a` back from `from` to `to` in `steps` steps, preceded by
    /// `damping_steps` implicit Euler steps.
    pub fn rollback(&mut self, a: &mut Array, from: Time, to: Time, steps: usize, damping_steps: usize) -> Result<()> {
        ensure!(from > to, "rollback from {from} to {to} does not go back in time");
        ensure!(steps > 0, "rollback needs at least one step");
        let all_steps = (steps + damping_steps) as Real;
        let damping_to = from - (from - to) * damping_steps as Real / all_steps;
        if damping_steps > 0 && self.scheme != FdmSchemeDesc::ImplicitEuler {
            self.rollback_with(FdmSchemeDesc::ImplicitEuler, a, from, damping_to, damping_steps)?;
            self.rollback_with(self.scheme, a, damping_to, to, steps)
        } else {
            self.rollback_with(self.scheme, a, from, to, steps + damping_steps)
        }
    }

    /// Roll `a` back from `maturity` to zero, keeping a snapshot just after
    /// zero for theta.
    ///
    /// Returns the snapshot time and values, or `None` if there are too few
    /// steps to take one.
    pub fn rollback_with_snapshot(
        &mut self,
        a: &mut Array,
        maturity: Time,
        steps: usize,
        damping_steps: usize,
    ) -> Result<Option<(Time, Array)>> {
        if steps < 2 {
            self.rollback(a, maturity, 0.0, steps, damping_steps)?;
            return Ok(None);
        }
        let first_stop = self
            .stopping_times
            .iter()
            .copied()
            .find(|&t| t > 0.0)
            .unwrap_or(maturity);
        let snapshot_time = 0.99 * first_stop.min(1.0 / 365.0).min(maturity);
        self.rollback(a, maturity, snapshot_time, steps - 1, damping_steps)?;
        let snapshot = a.clone();
        self.rollback_with(self.scheme, a, snapshot_time, 0.0, 1)?;
        Ok(Some((snapshot_time, snapshot)))
    }

    fn rollback_with(&mut self, scheme: FdmSchemeDesc, a: &mut Array, from: Time, to: Time, steps: usize) -> Result<()> {
        trace!(?scheme, from, to, steps, "rollback");
        let dt = (from - to) / steps as Real;
        let mut t = from;
        self.condition.apply_to(a, from)?;
        for i in 0..steps {
            let mut now = t;
            let next = if i + 1 == steps { to } else { t - dt };
            let mut hit = false;
            for &stop in self.stopping_times.iter().rev() {
                if next <= stop && stop < now {
                    hit = true;
                    scheme.step(self.op.as_mut(), &self.bc, a, now, now - stop)?;
                    self.condition.apply_to(a, stop)?;
                    now = stop;
                }
            }
            if !hit {
                scheme.step(self.op.as_mut(), &self.bc, a, now, now - next)?;
                self.condition.apply_to(a, next)?;
            } else if now > next {
                scheme.step(self.op.as_mut(), &self.bc, a, now, now - next)?;
                self.condition.apply_to(a, next)?;
            }
            t = next;
        }
        Ok(())
    }
}

// ─── Solutions ────────────────────────────────────────────────────────────────

fn spline_in_range(spline: &CubicNaturalSpline, x: Real) -> Result<()> {
    ensure!(
        spline.is_in_range(x),
        "log-spot {x} outside the grid [{}, {}]",
        spline.x_min(),
        spline.x_max()
    );
    Ok(())
}

fn missing_theta() -> Error {
    Error::MissingResult("theta".into())
}

/// Solution on a log-spot grid, interpolated with a cubic spline.
#[derive(Debug, Clone)]
pub struct Fdm1dSolution {
    spline: CubicNaturalSpline,
    snapshot: Option<(Time, CubicNaturalSpline)>,
}

impl Fdm1dSolution {
    /// Solution `values` on log-spot locations `x`, with an optional
    /// snapshot for theta.
    pub fn new(x: &[Real], values: &Array, snapshot: Option<(Time, Array)>) -> Result<Self> {
        let spline = CubicNaturalSpline::new(x, values.as_slice())?;
        let snapshot = match snapshot {
            Some((t, v)) => Some((t, CubicNaturalSpline::new(x, v.as_slice())?)),
            None => None,
        };
        Ok(Self { spline, snapshot })
    }

    /// Value at `spot`.
    pub fn value_at(&self, spot: Real) -> Result<Real> {
        let x = spot.ln();
        spline_in_range(&self.spline, x)?;
        Ok(self.spline.value(x))
    }

    /// `∂V/∂S` at `spot`.
    pub fn delta_at(&self, spot: Real) -> Result<Real> {
        let x = spot.ln();
        spline_in_range(&self.spline, x)?;
        Ok(self.spline.derivative(x) / spot)
    }

    /// `∂²V/∂S²` at `spot`.
    pub fn gamma_at(&self, spot: Real) -> Result<Real> {
        let x = spot.ln();
        spline_in_range(&self.spline, x)?;
        Ok((self.spline.second_derivative(x) - self.spline.derivative(x)) / (spot * spot))
    }

    /// `∂V/∂t` at `spot`, from the snapshot.
    pub fn theta_at(&self, spot: Real) -> Result<Real> {
        let (t, later) = self.snapshot.as_ref().ok_or_else(missing_theta)?;
        let x = spot.ln();
        spline_in_range(later, x)?;
        Ok((later.value(x) - self.spline.value(x)) / t)
    }
}

/// Solution on a log-spot × variance grid.
///
/// Values are bilinear in both directions; spot Greeks come from a cubic
/// spline through the slice at the requested variance.
#[derive(Debug, Clone)]
pub struct Fdm2dSolution {
    x: Vec<Real>,
    v: Vec<Real>,
    values: Vec<Real>,
    surface: BilinearInterpolation,
    snapshot: Option<(Time, BilinearInterpolation)>,
}

impl Fdm2dSolution {
    /// Solution `values` on the grid `x × v`, `x` varying fastest.
    pub fn new(x: &[Real], v: &[Real], values: &Array, snapshot: Option<(Time, Array)>) -> Result<Self> {
        let surface = BilinearInterpolation::new(x, v, values.as_slice())?;
        let snapshot = match snapshot {
            Some((t, s)) => Some((t, BilinearInterpolation::new(x, v, s.as_slice())?)),
            None => None,
        };
        Ok(Self {
            x: x.to_vec(),
            v: v.to_vec(),
            values: values.to_vec(),
            surface,
            snapshot,
        })
    }

    fn check(&self, x: Real, v: Real) -> Result<()> {
        ensure!(
            self.surface.is_in_range(x, v),
            "point ({x}, {v}) outside the solution grid"
        );
        Ok(())
    }

    /// Value at `(spot, variance)`.
    pub fn value_at(&self, spot: Real, variance: Real) -> Result<Real> {
        let x = spot.ln();
        self.check(x, variance)?;
        Ok(self.surface.value(x, variance))
    }

    fn slice(&self, variance: Real) -> Result<CubicNaturalSpline> {
        let nx = self.x.len();
        let j = self
            .v
            .partition_point(|&node| node <= variance)
            .clamp(1, self.v.len() - 1)
            - 1;
        let w = (variance - self.v[j]) / (self.v[j + 1] - self.v[j]);
        let line: Vec<Real> = (0..nx)
            .map(|i| (1.0 - w) * self.values[j * nx + i] + w * self.values[(j + 1) * nx + i])
            .collect();
        CubicNaturalSpline::new(&self.x, &line)
    }

    /// `∂V/∂S` at `(spot, variance)`.
    pub fn delta_at(&self, spot: Real, variance: Real) -> Result<Real> {
        let x = spot.ln();
        self.check(x, variance)?;
        Ok(self.slice(variance)?.derivative(x) / spot)
    }

    /// `∂²V/∂S²` at `(spot, variance)`.
    pub fn gamma_at(&self, spot: Real, variance: Real) -> Result<Real> {
        let x = spot.ln();
        self.check(x, variance)?;
        let s = self.slice(variance)?;
        Ok((s.second_derivative(x) - s.derivative(x)) / (spot * spot))
    }

    /// `∂V/∂t` at `(spot, variance)`, from the snapshot.
    pub fn theta_at(&self, spot: Real, variance: Real) -> Result<Real> {
        let (t, later) = self.snapshot.as_ref().ok_or_else(missing_theta)?;
        let x = spot.ln();
        self.check(x, variance)?;
        Ok((later.value(x, variance) - self.surface.value(x, variance)) / t)
    }
}
