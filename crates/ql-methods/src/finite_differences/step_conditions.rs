//! Conditions applied to the solution during backward rollback.

use std::fmt::Debug;
use std::sync::Arc;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::interpolations::{CubicNaturalSpline, Interpolation};
use ql_math::Array;

use super::meshers::FdmMesherComposite;

const TIME_TOLERANCE: Time = 1e-8;

/// A transformation of the solution at a given time.
pub trait StepCondition: Debug + Send + Sync {
    /// Apply the condition to the values `a` at time `t`.
    fn apply_to(&self, a: &mut Array, t: Time) -> Result<()>;

    /// Times at which the rollback must stop for the condition.
    fn stopping_times(&self) -> Vec<Time> {
        Vec::new()
    }
}

/// Early exercise at every time step.
#[derive(Debug, Clone, PartialEq)]
pub struct AmericanStepCondition {
    exercise_values: Array,
}

impl AmericanStepCondition {
    /// Condition flooring the solution at `exercise_values`.
    pub fn new(exercise_values: Array) -> Self {
        Self { exercise_values }
    }
}

impl StepCondition for AmericanStepCondition {
    fn apply_to(&self, a: &mut Array, _t: Time) -> Result<()> {
        floor_at(a, &self.exercise_values)
    }
}

/// Early exercise on a set of dates.
#[derive(Debug, Clone, PartialEq)]
pub struct BermudanStepCondition {
    exercise_times: Vec<Time>,
    exercise_values: Array,
}

impl BermudanStepCondition {
    /// Condition flooring the solution at `exercise_values` at each of
    /// `exercise_times`.
    pub fn new(exercise_times: Vec<Time>, exercise_values: Array) -> Self {
        Self {
            exercise_times,
            exercise_values,
        }
    }
}

impl StepCondition for BermudanStepCondition {
    fn apply_to(&self, a: &mut Array, t: Time) -> Result<()> {
        if self.exercise_times.iter().any(|&e| (e - t).abs() < TIME_TOLERANCE) {
            floor_at(a, &self.exercise_values)?;
        }
        Ok(())
    }

    fn stopping_times(&self) -> Vec<Time> {
        self.exercise_times.clone()
    }
}

fn floor_at(a: &mut Array, exercise_values: &Array) -> Result<()> {
    ensure!(a.len() == exercise_values.len(), "exercise values do not match the grid");
    for (v, &e) in a.as_mut_slice().iter_mut().zip(exercise_values.iter()) {
        *v = v.max(e);
    }
    Ok(())
}

/// Cash dividends on a log-spot direction.
///
/// Crossing a dividend `D` at `t` backwards maps the value at spot `S` to
/// the value at `S − D`, read off a cubic spline along the spot direction.
#[derive(Debug, Clone)]
pub struct DividendStepCondition {
    mesh: FdmMesherComposite,
    direction: usize,
    dividends: Vec<(Time, Real)>,
}

impl DividendStepCondition {
    /// Condition for `dividends` as `(time, amount)` pairs on `mesh`, whose
    /// `direction` is log-spot.
    pub fn new(mesh: FdmMesherComposite, direction: usize, dividends: Vec<(Time, Real)>) -> Self {
        Self {
            mesh,
            direction,
            dividends,
        }
    }

    fn shift(&self, a: &mut Array, amount: Real) -> Result<()> {
        let layout = self.mesh.layout();
        let mesher = self.mesh.mesher(self.direction);
        let x = mesher.locations();
        let n = x.len();
        let stride = layout.spacing()[self.direction];
        let starts: Vec<usize> = (0..layout.size())
            .filter(|&i| layout.coordinate(i, self.direction) == 0)
            .collect();
        let values = a.as_mut_slice();
        for start in starts {
            let line: Vec<Real> = (0..n).map(|k| values[start + k * stride]).collect();
            let spline = CubicNaturalSpline::new(x, &line)?;
            for (k, &xk) in x.iter().enumerate() {
                let shifted = xk.exp() - amount;
                let target = if shifted > 0.0 { shifted.ln() } else { x[0] };
                values[start + k * stride] = spline.value(target.clamp(x[0], x[n - 1]));
            }
        }
        Ok(())
    }
}

impl StepCondition for DividendStepCondition {
    fn apply_to(&self, a: &mut Array, t: Time) -> Result<()> {
        for &(time, amount) in &self.dividends {
            if (time - t).abs() < TIME_TOLERANCE {
                self.shift(a, amount)?;
            }
        }
        Ok(())
    }

    fn stopping_times(&self) -> Vec<Time> {
        self.dividends.iter().map(|&(t, _)| t).collect()
    }
}

/// Several conditions applied in order.
#[derive(Debug, Clone, Default)]
pub struct CompositeStepCondition {
    conditions: Vec<Arc<dyn StepCondition>>,
}

impl CompositeStepCondition {
    /// No conditions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition.
    pub fn push(&mut self, condition: Arc<dyn StepCondition>) {
        self.conditions.push(condition);
    }

    /// `true` if there are no conditions.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl StepCondition for CompositeStepCondition {
    fn apply_to(&self, a: &mut Array, t: Time) -> Result<()> {
        self.conditions.iter().try_for_each(|c| c.apply_to(a, t))
    }

    /// Sorted, de-duplicated union of the conditions' stopping times.
    fn stopping_times(&self) -> Vec<Time> {
        let mut times: Vec<Time> = self.conditions.iter().flat_map(|c| c.stopping_times()).collect();
        times.sort_by(Real::total_cmp);
        times.dedup_by(|a, b| (*a - *b).abs() < TIME_TOLERANCE);
        times
    }
}
