use ql_core::Real;
use serde::{Deserialize, Serialize};

use crate::array::Array;

/// Admissible region of a parameter vector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Constraint {
    /// Everything is admissible.
    #[default]
    None,
    /// Every component strictly positive.
    Positive,
    /// Every component in `[low, high]`.
    Boundary {
        /// Lower bound.
        low: Real,
        /// Upper bound.
        high: Real,
    },
    /// A constraint on the single component `index`.
    Component {
        /// Position in the parameter vector.
        index: usize,
        /// Constraint on that component.
        constraint: Box<Constraint>,
    },
    /// All of the given constraints.
    Composite(Vec<Constraint>),
}

impl Constraint {
    /// `true` if `x` is admissible.
    pub fn test(&self, x: &Array) -> bool {
        match self {
            Constraint::None => true,
            Constraint::Positive => x.iter().all(|&v| v > 0.0),
            Constraint::Boundary { low, high } => x.iter().all(|&v| v >= *low && v <= *high),
            Constraint::Component { index, constraint } => match x.as_slice().get(*index) {
                Some(&v) => constraint.test(&Array::from_slice(&[v])),
                None => false,
            },
            Constraint::Composite(all) => all.iter().all(|c| c.test(x)),
        }
    }

    /// Largest `t` in `{beta, beta/2, beta/4, ...}` such that
    /// `x + t·direction` is admissible, or zero if none is found.
    pub fn admissible_step(&self, x: &Array, direction: &Array, beta: Real) -> Real {
        let mut t = beta;
        for _ in 0..60 {
            let mut trial = x.clone();
            trial.axpy(t, direction);
            if self.test(&trial) {
                return t;
            }
            t *= 0.5;
        }
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn componentwise_constraints_compose() {
        let c = Constraint::Composite(vec![
            Constraint::Component {
                index: 0,
                constraint: Box::new(Constraint::Positive),
            },
            Constraint::Component {
                index: 1,
                constraint: Box::new(Constraint::Boundary { low: -1.0, high: 1.0 }),
            },
        ]);
        assert!(c.test(&Array::from_slice(&[0.5, -0.9])));
        assert!(!c.test(&Array::from_slice(&[0.0, 0.0])));
        assert!(!c.test(&Array::from_slice(&[1.0, 1.5])));
        assert!(!c.test(&Array::from_slice(&[1.0])));
    }

    #[test]
    fn admissible_step_backtracks() {
        let x = Array::from_slice(&[1.0]);
        let d = Array::from_slice(&[-4.0]);
        let t = Constraint::Positive.admissible_step(&x, &d, 1.0);
        assert_eq!(t, 0.125);
        assert_eq!(Constraint::None.admissible_step(&x, &d, 1.0), 1.0);
    }
}
