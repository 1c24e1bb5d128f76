//! Black-Scholes operator in log-spot.

use std::sync::Arc;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::Array;
use ql_processes::GeneralizedBlackScholesProcess;

use super::meshers::FdmMesherComposite;
use super::operators::{FdmLinearOpComposite, FirstDerivativeOp, SecondDerivativeOp, TripleBandLinearOp};

/// `L = (r − q − σ²/2)·∂x + σ²/2·∂xx − r` along direction 0, `x = ln S`.
///
/// Rates are the forward rates over the current step and `σ²` the forward
/// variance at `strike` divided by the step length.
#[derive(Debug, Clone)]
pub struct FdmBlackScholesOp {
    process: Arc<GeneralizedBlackScholesProcess>,
    strike: Real,
    dx: TripleBandLinearOp,
    dxx: TripleBandLinearOp,
    map: TripleBandLinearOp,
}

impl FdmBlackScholesOp {
    /// Operator on `mesh`, whose direction 0 is log-spot.
    pub fn new(mesh: &FdmMesherComposite, process: Arc<GeneralizedBlackScholesProcess>, strike: Real) -> Self {
        let dx = FirstDerivativeOp::new(0, mesh);
        let dxx = SecondDerivativeOp::new(0, mesh);
        let map = TripleBandLinearOp::zero(0, Arc::clone(mesh.layout()));
        Self {
            process,
            strike,
            dx,
            dxx,
            map,
        }
    }
}

impl FdmLinearOpComposite for FdmBlackScholesOp {
    fn size(&self) -> usize {
        1
    }

    fn set_time(&mut self, t1: Time, t2: Time) -> Result<()> {
        ensure!(t2 > t1, "empty time step [{t1}, {t2}]");
        let r = self.process.risk_free_rate()?.forward_rate(t1, t2)?;
        let q = self.process.dividend_yield()?.forward_rate(t1, t2)?;
        let v = self.process.black_vol()?.black_forward_variance(t1, t2, self.strike)? / (t2 - t1);
        let n = self.map.size();
        self.map = self
            .dx
            .scale(r - q - 0.5 * v)
            .add(&self.dxx.scale(0.5 * v))?
            .add_diagonal(&Array::from_element(n, -r));
        Ok(())
    }

    fn apply(&self, r: &Array) -> Array {
        self.map.apply(r)
    }

    fn apply_mixed(&self, r: &Array) -> Array {
        Array::zeros(r.len())
    }

    fn apply_direction(&self, direction: usize, r: &Array) -> Array {
        if direction == 0 {
            self.map.apply(r)
        } else {
            Array::zeros(r.len())
        }
    }

    fn solve_splitting(&self, direction: usize, r: &Array, a: Real) -> Array {
        if direction == 0 {
            self.map.solve_splitting(r, a, 1.0)
        } else {
            r.clone()
        }
    }
}
