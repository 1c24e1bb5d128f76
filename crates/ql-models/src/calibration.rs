//! Least-squares calibration of a model to market instruments.
//!
//! Each [`CalibrationHelper`] contributes one residual, its calibration
//! error scaled by the square root of its weight.  The optimizer works on
//! the free (non-fixed) entries of the model's parameter vector and stops
//! according to its [`EndCriteria`]; the resulting [`CalibrationReport`]
//! separates an optimizer that ran out of iterations from one that
//! converged to a fit that is still poor.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ql_core::errors::{Error, Result};
use ql_core::{ensure, ensure_post, Real};
use ql_math::optimization::{Constraint, EndCriteria, EndCriteriaType, OptimizationMethod, Problem};
use ql_math::Array;

use crate::calibrated_model::{entry_constraints, CalibratedModel};

/// How a helper measures the distance between model and market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationErrorType {
    /// `(model − market) / market`.
    #[default]
    RelativePriceError,
    /// `model − market`.
    PriceError,
    /// Implied volatility of the model price minus the quoted volatility.
    ImpliedVolError,
}

/// A market instrument a model can be fitted to.
pub trait CalibrationHelper<M: ?Sized>: Debug + Send + Sync {
    /// Price implied by the market quote.
    fn market_value(&self) -> Result<Real>;

    /// Price under `model`.
    fn model_value(&self, model: &M) -> Result<Real>;

    /// Residual contributed to the calibration.
    fn calibration_error(&self, model: &M) -> Result<Real> {
        Ok(self.model_value(model)? - self.market_value()?)
    }
}

/// Outcome of [`calibrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationReport {
    /// Why the optimizer stopped.
    pub end_type: EndCriteriaType,
    /// Optimizer iterations.
    pub iterations: usize,
    /// Cost function evaluations.
    pub function_evaluations: usize,
    /// Weighted sum of squared calibration errors at the solution.
    pub sum_of_squared_errors: Real,
    /// Full parameter vector at the solution.
    pub params: Array,
}

impl CalibrationReport {
    /// `true` if the optimizer stopped for a reason other than its
    /// iteration budget.
    pub fn converged(&self) -> bool {
        self.end_type.succeeded()
    }

    /// Fail with [`Error::Convergence`] if the optimizer did not converge and
    /// with a postcondition error if it did but the fit is worse than
    /// `threshold`.
    pub fn ensure_fit(&self, threshold: Real) -> Result<()> {
        if !self.converged() {
            return Err(Error::Convergence(format!(
                "calibration stopped after {} iterations ({:?}) with error {:e}",
                self.iterations, self.end_type, self.sum_of_squared_errors
            )));
        }
        ensure_post!(
            self.sum_of_squared_errors <= threshold,
            "calibration converged to a poor fit: sum of squared errors {:e} exceeds {threshold:e}",
            self.sum_of_squared_errors
        );
        Ok(())
    }
}

/// Which helpers count, and how much, and which parameters stay put.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationOptions {
    /// Weight per helper; all ones if `None`.
    pub weights: Option<Vec<Real>>,
    /// Flags per entry of the parameter vector; `true` keeps it fixed.
    pub fixed: Option<Vec<bool>>,
}

impl CalibrationOptions {
    /// Weight the helpers.
    pub fn with_weights(mut self, weights: Vec<Real>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Keep the flagged parameters at their current values.
    pub fn with_fixed(mut self, fixed: Vec<bool>) -> Self {
        self.fixed = Some(fixed);
        self
    }
}

/// Fit `model` to `helpers` with equal weights and all parameters free.
///
/// See [`calibrate_with`].
pub fn calibrate<M, H, O>(
    model: &mut M,
    helpers: &[H],
    method: &O,
    end_criteria: &EndCriteria,
    weights: Option<&[Real]>,
) -> Result<CalibrationReport>
where
    M: CalibratedModel + Clone,
    H: CalibrationHelper<M>,
    O: OptimizationMethod,
{
    let options = CalibrationOptions {
        weights: weights.map(<[Real]>::to_vec),
        fixed: None,
    };
    calibrate_with(model, helpers, method, end_criteria, &options)
}

/// Fit `model` to `helpers` by minimizing the weighted sum of squared
/// calibration errors.
///
/// The model is left at the best parameters found, converged or not.
pub fn calibrate_with<M, H, O>(
    model: &mut M,
    helpers: &[H],
    method: &O,
    end_criteria: &EndCriteria,
    options: &CalibrationOptions,
) -> Result<CalibrationReport>
where
    M: CalibratedModel + Clone,
    H: CalibrationHelper<M>,
    O: OptimizationMethod,
{
    ensure!(!helpers.is_empty(), "no calibration helpers given");
    let n = model.parameter_count();
    let weights = match &options.weights {
        Some(w) => {
            ensure!(
                w.len() == helpers.len(),
                "{} weights given for {} helpers",
                w.len(),
                helpers.len()
            );
            ensure!(w.iter().all(|&x| x >= 0.0), "weights must be non-negative");
            w.clone()
        }
        None => vec![1.0; helpers.len()],
    };
    let fixed = match &options.fixed {
        Some(f) => {
            ensure!(f.len() == n, "{} fixed flags given for {n} parameters", f.len());
            f.clone()
        }
        None => vec![false; n],
    };
    let free: Vec<usize> = (0..n).filter(|&i| !fixed[i]).collect();
    ensure!(!free.is_empty(), "every parameter is fixed");

    let base = model.params_array();
    let expand = |x: &Array| -> Array {
        let mut full = base.clone();
        for (k, &i) in free.iter().enumerate() {
            full[i] = x[k];
        }
        full
    };
    let all_constraints = entry_constraints(model.params());
    let constraint = Constraint::Composite(
        free.iter()
            .enumerate()
            .map(|(k, &i)| Constraint::Component {
                index: k,
                constraint: Box::new(all_constraints[i].clone()),
            })
            .collect(),
    );

    let template = model.clone();
    let cost = |x: &Array| -> Result<Array> {
        let mut trial = template.clone();
        trial.set_params(expand(x).as_slice())?;
        helpers
            .iter()
            .zip(&weights)
            .map(|(h, &w)| -> Result<Real> { Ok(w.sqrt() * h.calibration_error(&trial)?) })
            .collect()
    };
    let problem = Problem::new(&cost, &constraint);
    let initial: Array = free.iter().map(|&i| base[i]).collect();
    let result = method.minimize(&problem, &initial, end_criteria)?;

    let params = expand(&result.x);
    model.set_params(params.as_slice())?;
    let report = CalibrationReport {
        end_type: result.end_type,
        iterations: result.iterations,
        function_evaluations: result.function_evaluations,
        sum_of_squared_errors: result.value,
        params,
    };
    if report.converged() {
        info!(
            helpers = helpers.len(),
            iterations = report.iterations,
            sse = report.sum_of_squared_errors,
            end_type = ?report.end_type,
            "calibration finished"
        );
    } else {
        warn!(
            helpers = helpers.len(),
            iterations = report.iterations,
            sse = report.sum_of_squared_errors,
            "calibration did not converge"
        );
    }
    Ok(report)
}
