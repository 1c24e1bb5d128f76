//! Model parameters and the [`CalibratedModel`] trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::optimization::Constraint;
use ql_math::Array;

// ────────────────────────────────────────────────────────────────────────────
// Parameter
// ────────────────────────────────────────────────────────────────────────────

/// A calibratable model parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Parameter {
    /// A single value, constant in time.
    Constant {
        /// Current value.
        value: Real,
        /// Admissible values.
        constraint: Constraint,
    },
    /// A parameter the model does not use; contributes nothing to the
    /// parameter vector and evaluates to zero.
    Null,
    /// Constant on each interval of a time grid.
    ///
    /// `values[i]` applies on `[times[i-1], times[i])`, with `values[0]`
    /// before the first time and the last value after the last one.
    PiecewiseConstant {
        /// Increasing breakpoints.
        times: Vec<Time>,
        /// One value per interval, `times.len() + 1` in all.
        values: Vec<Real>,
        /// Admissible values, applied to each interval.
        constraint: Constraint,
    },
}

static NO_CONSTRAINT: Constraint = Constraint::None;

impl Parameter {
    /// A constant parameter.
    pub fn constant(value: Real, constraint: Constraint) -> Self {
        Parameter::Constant { value, constraint }
    }

    /// A piecewise-constant parameter.
    pub fn piecewise(times: Vec<Time>, values: Vec<Real>, constraint: Constraint) -> Result<Self> {
        ensure!(
            values.len() == times.len() + 1,
            "{} breakpoints need {} values, got {}",
            times.len(),
            times.len() + 1,
            values.len()
        );
        ensure!(
            times.iter().all(|&t| t > 0.0) && times.windows(2).all(|w| w[0] < w[1]),
            "breakpoints must be positive and increasing"
        );
        Ok(Parameter::PiecewiseConstant {
            times,
            values,
            constraint,
        })
    }

    /// Number of free values.
    pub fn size(&self) -> usize {
        match self {
            Parameter::Constant { .. } => 1,
            Parameter::Null => 0,
            Parameter::PiecewiseConstant { values, .. } => values.len(),
        }
    }

    /// Current free values.
    pub fn values(&self) -> Vec<Real> {
        match self {
            Parameter::Constant { value, .. } => vec![*value],
            Parameter::Null => Vec::new(),
            Parameter::PiecewiseConstant { values, .. } => values.clone(),
        }
    }

    /// Replace the free values; fails if the count is wrong.
    pub fn set_values(&mut self, new_values: &[Real]) -> Result<()> {
        ensure!(
            new_values.len() == self.size(),
            "parameter takes {} values, got {}",
            self.size(),
            new_values.len()
        );
        match self {
            Parameter::Constant { value, .. } => *value = new_values[0],
            Parameter::Null => {}
            Parameter::PiecewiseConstant { values, .. } => values.copy_from_slice(new_values),
        }
        Ok(())
    }

    /// Value in effect at time `t`.
    pub fn value(&self, t: Time) -> Real {
        match self {
            Parameter::Constant { value, .. } => *value,
            Parameter::Null => 0.0,
            Parameter::PiecewiseConstant { times, values, .. } => {
                values[times.partition_point(|&x| x <= t)]
            }
        }
    }

    /// The constraint each free value must satisfy.
    pub fn constraint(&self) -> &Constraint {
        match self {
            Parameter::Constant { constraint, .. } | Parameter::PiecewiseConstant { constraint, .. } => {
                constraint
            }
            Parameter::Null => &NO_CONSTRAINT,
        }
    }

    /// `true` if every free value satisfies the constraint.
    pub fn is_valid(&self) -> bool {
        self.values()
            .iter()
            .all(|&v| self.constraint().test(&Array::from_slice(&[v])))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Constant { value, .. } => write!(f, "{value}"),
            Parameter::Null => write!(f, "null"),
            Parameter::PiecewiseConstant { values, .. } => write!(f, "{values:?}"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CalibratedModel trait
// ────────────────────────────────────────────────────────────────────────────

/// A model whose parameters can be fitted to market data.
///
/// The parameter vector seen by optimizers is the concatenation of the free
/// values of [`params`][Self::params], in order.
pub trait CalibratedModel: fmt::Debug + Send + Sync {
    /// The model's parameters.
    fn params(&self) -> &[Parameter];

    /// Set all free values from one flat vector.
    fn set_params(&mut self, values: &[Real]) -> Result<()>;

    /// Number of free values.
    fn parameter_count(&self) -> usize {
        self.params().iter().map(Parameter::size).sum()
    }

    /// All free values as one flat vector.
    fn params_array(&self) -> Array {
        self.params().iter().flat_map(Parameter::values).collect()
    }

    /// Constraint on the flat parameter vector.
    fn constraint(&self) -> Constraint {
        Constraint::Composite(
            entry_constraints(self.params())
                .into_iter()
                .enumerate()
                .map(|(index, c)| Constraint::Component {
                    index,
                    constraint: Box::new(c),
                })
                .collect(),
        )
    }
}

/// One constraint per entry of the flat parameter vector.
pub(crate) fn entry_constraints(params: &[Parameter]) -> Vec<Constraint> {
    params
        .iter()
        .flat_map(|p| std::iter::repeat(p.constraint().clone()).take(p.size()))
        .collect()
}

/// Split a flat vector into per-parameter slices and store them.
pub(crate) fn distribute(params: &mut [Parameter], values: &[Real]) -> Result<()> {
    let expected: usize = params.iter().map(Parameter::size).sum();
    ensure!(
        values.len() == expected,
        "model takes {expected} parameter values, got {}",
        values.len()
    );
    let mut offset = 0;
    for p in params.iter_mut() {
        let n = p.size();
        p.set_values(&values[offset..offset + n])?;
        offset += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_parameter() {
        let mut p = Parameter::constant(0.05, Constraint::Positive);
        assert_eq!(p.size(), 1);
        assert_eq!(p.value(3.0), 0.05);
        assert!(p.is_valid());
        p.set_values(&[-0.01]).unwrap();
        assert!(!p.is_valid());
        assert!(p.set_values(&[0.1, 0.2]).is_err());
    }

    #[test]
    fn null_parameter_is_empty() {
        let p = Parameter::Null;
        assert_eq!(p.size(), 0);
        assert_eq!(p.value(1.0), 0.0);
        assert!(p.values().is_empty());
        assert_eq!(p.constraint(), &Constraint::None);
    }

    #[test]
    fn piecewise_parameter_steps_at_breakpoints() {
        let p = Parameter::piecewise(vec![1.0, 2.0], vec![0.1, 0.2, 0.3], Constraint::None).unwrap();
        assert_eq!(p.size(), 3);
        assert_eq!(p.value(0.5), 0.1);
        assert_eq!(p.value(1.0), 0.2);
        assert_eq!(p.value(1.5), 0.2);
        assert_eq!(p.value(10.0), 0.3);
        assert!(Parameter::piecewise(vec![1.0], vec![0.1], Constraint::None).is_err());
        assert!(Parameter::piecewise(vec![2.0, 1.0], vec![0.1, 0.2, 0.3], Constraint::None).is_err());
    }

    #[test]
    fn flat_constraint_is_per_entry() {
        let params = vec![
            Parameter::constant(1.0, Constraint::Positive),
            Parameter::Null,
            Parameter::constant(0.0, Constraint::Boundary { low: -1.0, high: 1.0 }),
        ];
        let constraints = entry_constraints(&params);
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[1], Constraint::Boundary { low: -1.0, high: 1.0 });
    }

    #[test]
    fn distribute_checks_length() {
        let mut params = vec![
            Parameter::constant(1.0, Constraint::None),
            Parameter::piecewise(vec![1.0], vec![0.0, 0.0], Constraint::None).unwrap(),
        ];
        distribute(&mut params, &[2.0, 3.0, 4.0]).unwrap();
        assert_eq!(params[0].value(0.0), 2.0);
        assert_eq!(params[1].value(2.0), 4.0);
        assert!(distribute(&mut params, &[1.0]).is_err());
    }
}
