//! Adaptive Gauss-Lobatto integration (Gander & Gautschi, "Adaptive
//! Quadrature - Revisited", BIT 40, 2000).
//!
//! Each step compares the 4-point Gauss-Lobatto rule with its 7-point
//! Kronrod extension and splits the interval into six parts until the two
//! agree to within the tolerance, measured relative to an initial 13-point
//! estimate of the whole integral.

use std::cell::Cell;

use ql_core::errors::{Error, Result};
use ql_core::Real;

use super::{counted, EvaluationCounter, Integrator};

const ALPHA: Real = 0.816_496_580_927_726; // sqrt(2/3)
const BETA: Real = 0.447_213_595_499_958; // 1/sqrt(5)
const X1: Real = 0.942_882_415_695_480;
const X2: Real = 0.641_853_342_345_781;
const X3: Real = 0.236_383_199_662_150;

/// Adaptive Gauss-Lobatto integrator.
#[derive(Debug, Clone)]
pub struct GaussLobattoIntegral {
    max_evaluations: usize,
    absolute_accuracy: Real,
    relative_accuracy: Option<Real>,
    use_convergence_estimate: bool,
    evaluations: EvaluationCounter,
}

impl GaussLobattoIntegral {
    /// Create an integrator with an evaluation budget and accuracy targets.
    ///
    /// When `relative_accuracy` is given, the stricter of the two targets is
    /// used.
    pub fn new(
        max_evaluations: usize,
        absolute_accuracy: Real,
        relative_accuracy: Option<Real>,
    ) -> Self {
        Self {
            max_evaluations,
            absolute_accuracy,
            relative_accuracy,
            use_convergence_estimate: true,
            evaluations: EvaluationCounter::default(),
        }
    }

    /// Disable the error-ratio correction of the tolerance.
    pub fn without_convergence_estimate(mut self) -> Self {
        self.use_convergence_estimate = false;
        self
    }

    fn absolute_tolerance<F: Fn(Real) -> Real>(&self, f: &F, a: Real, b: Real) -> Real {
        let m = 0.5 * (a + b);
        let h = 0.5 * (b - a);
        let (y1, y3, y5, y7) = (f(a), f(m - ALPHA * h), f(m - BETA * h), f(m));
        let (y9, y11, y13) = (f(m + BETA * h), f(m + ALPHA * h), f(b));
        let (f1, f2) = (f(m - X1 * h), f(m + X1 * h));
        let (f3, f4) = (f(m - X2 * h), f(m + X2 * h));
        let (f5, f6) = (f(m - X3 * h), f(m + X3 * h));

        let estimate = h
            * (0.015_827_191_973_480_183 * (y1 + y13)
                + 0.094_273_840_218_850_046 * (f1 + f2)
                + 0.155_071_987_336_585_4 * (y3 + y11)
                + 0.188_821_573_960_182_45 * (f3 + f4)
                + 0.199_773_405_226_858_53 * (y5 + y9)
                + 0.224_926_465_333_339_53 * (f5 + f6)
                + 0.242_611_071_901_407_73 * y7);

        let mut r = 1.0;
        if self.use_convergence_estimate {
            let lobatto = h / 6.0 * (y1 + y13 + 5.0 * (y5 + y9));
            let kronrod = h / 1470.0
                * (77.0 * (y1 + y13) + 432.0 * (y3 + y11) + 625.0 * (y5 + y9) + 672.0 * y7);
            let denom = (lobatto - estimate).abs();
            if denom != 0.0 {
                r = (kronrod - estimate).abs() / denom;
            }
            if r == 0.0 || r > 1.0 {
                r = 1.0;
            }
        }
        let tol = match self.relative_accuracy {
            Some(rel) => self
                .absolute_accuracy
                .min(estimate.abs() * rel.max(Real::EPSILON)),
            None => self.absolute_accuracy,
        };
        tol / (r * Real::EPSILON)
    }

    #[allow(clippy::too_many_arguments)]
    fn step<F: Fn(Real) -> Real>(
        &self,
        f: &F,
        a: Real,
        b: Real,
        fa: Real,
        fb: Real,
        acc: Real,
        count: &Cell<usize>,
    ) -> Result<Real> {
        let h = 0.5 * (b - a);
        let m = 0.5 * (a + b);
        let (mll, ml, mr, mrr) = (m - ALPHA * h, m - BETA * h, m + BETA * h, m + ALPHA * h);
        let (fmll, fml, fm, fmr, fmrr) = (f(mll), f(ml), f(m), f(mr), f(mrr));

        let lobatto = h / 6.0 * (fa + fb + 5.0 * (fml + fmr));
        let kronrod = h / 1470.0
            * (77.0 * (fa + fb) + 432.0 * (fmll + fmrr) + 625.0 * (fml + fmr) + 672.0 * fm);

        // acc is scaled by 1/eps: adding the error estimate leaves it
        // unchanged once the estimate is below tolerance.
        if acc + (kronrod - lobatto) == acc || mll <= a || b <= mrr {
            if m <= a || b <= m {
                return Err(Error::Convergence(
                    "Gauss-Lobatto: interval contains no more machine numbers".into(),
                ));
            }
            return Ok(kronrod);
        }
        if count.get() >= self.max_evaluations {
            return Err(Error::Convergence(format!(
                "Gauss-Lobatto: evaluation budget of {} exhausted",
                self.max_evaluations
            )));
        }
        Ok(self.step(f, a, mll, fa, fmll, acc, count)?
            + self.step(f, mll, ml, fmll, fml, acc, count)?
            + self.step(f, ml, m, fml, fm, acc, count)?
            + self.step(f, m, mr, fm, fmr, acc, count)?
            + self.step(f, mr, mrr, fmr, fmrr, acc, count)?
            + self.step(f, mrr, b, fmrr, fb, acc, count)?)
    }
}

impl Integrator for GaussLobattoIntegral {
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real> {
        let count = Cell::new(0);
        let g = counted(&f, &count);
        let result = if a == b {
            Ok(0.0)
        } else {
            let acc = self.absolute_tolerance(&g, a, b);
            self.step(&g, a, b, g(a), g(b), acc, &count)
        };
        self.evaluations.publish(count.get());
        result
    }

    fn number_of_evaluations(&self) -> usize {
        self.evaluations.get()
    }
}
