//! Constrained minimization.
//!
//! A [`CostFunction`] returns a residual vector; its scalar value is the
//! sum of squared residuals.  Optimizers stop according to
//! [`EndCriteria`] and report why in [`OptimizationResult::end_type`]:
//! running out of iterations is reported, not raised, so callers can tell
//! a poor fit from a failure to converge.

mod constraint;
mod end_criteria;
mod levenberg_marquardt;
mod simplex;

use std::cell::Cell;

use ql_core::{errors::Result, Real};

use crate::array::Array;
use crate::matrix::Matrix;

pub use constraint::Constraint;
pub use end_criteria::{EndCriteria, EndCriteriaType};
pub use levenberg_marquardt::LevenbergMarquardt;
pub use simplex::Simplex;

/// A vector-valued objective.
pub trait CostFunction {
    /// Residuals at `x`.
    fn values(&self, x: &Array) -> Result<Array>;

    /// Sum of squared residuals at `x`.
    fn value(&self, x: &Array) -> Result<Real> {
        let r = self.values(x)?;
        Ok(r.dot(&r))
    }

    /// Jacobian of the residuals, one row per residual.  The default uses
    /// forward differences.
    fn jacobian(&self, x: &Array) -> Result<Matrix> {
        let r0 = self.values(x)?;
        let mut jacobian = Matrix::zeros(r0.len(), x.len());
        for j in 0..x.len() {
            let h = Real::EPSILON.sqrt() * x[j].abs().max(1.0);
            let mut bumped = x.clone();
            bumped[j] += h;
            let r = self.values(&bumped)?;
            for i in 0..r0.len() {
                jacobian[(i, j)] = (r[i] - r0[i]) / h;
            }
        }
        Ok(jacobian)
    }
}

impl<F> CostFunction for F
where
    F: Fn(&Array) -> Result<Array>,
{
    fn values(&self, x: &Array) -> Result<Array> {
        self(x)
    }
}

/// A cost function together with its constraint, counting evaluations.
pub struct Problem<'a, C: CostFunction + ?Sized> {
    cost: &'a C,
    constraint: &'a Constraint,
    evaluations: Cell<usize>,
}

impl<'a, C: CostFunction + ?Sized> Problem<'a, C> {
    /// Minimize `cost` over the points satisfying `constraint`.
    pub fn new(cost: &'a C, constraint: &'a Constraint) -> Self {
        Self {
            cost,
            constraint,
            evaluations: Cell::new(0),
        }
    }

    /// The constraint.
    pub fn constraint(&self) -> &Constraint {
        self.constraint
    }

    /// Residuals at `x`.
    pub fn values(&self, x: &Array) -> Result<Array> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.cost.values(x)
    }

    /// Sum of squared residuals at `x`.
    pub fn value(&self, x: &Array) -> Result<Real> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.cost.value(x)
    }

    /// Jacobian at `x`; counts one evaluation per column plus one.
    pub fn jacobian(&self, x: &Array) -> Result<Matrix> {
        self.evaluations.set(self.evaluations.get() + x.len() + 1);
        self.cost.jacobian(x)
    }

    /// Cost function evaluations so far.
    pub fn function_evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Best point found.
    pub x: Array,
    /// Cost at [`x`][Self::x].
    pub value: Real,
    /// Iterations performed.
    pub iterations: usize,
    /// Cost function evaluations performed.
    pub function_evaluations: usize,
    /// Why the optimizer stopped.
    pub end_type: EndCriteriaType,
}

/// A minimization algorithm.
pub trait OptimizationMethod {
    /// Minimize `problem` from `initial`, which must satisfy the constraint.
    fn minimize<C: CostFunction + ?Sized>(
        &self,
        problem: &Problem<'_, C>,
        initial: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult>;
}
