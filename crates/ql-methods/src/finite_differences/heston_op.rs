//! Heston operator in log-spot and variance.

use std::sync::Arc;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::Array;
use ql_processes::HestonProcess;

use super::meshers::FdmMesherComposite;
use super::operators::{
    FdmLinearOpComposite, FirstDerivativeOp, NinePointLinearOp, SecondDerivativeOp, TripleBandLinearOp,
};

/// Heston operator with `x = ln S` along direction 0 and `v` along
/// direction 1:
///
/// * `L_x = (r − q − v/2)·∂x + v/2·∂xx − r/2`
/// * `L_v = σ²v/2·∂vv + κ(θ − v)·∂v − r/2`
/// * mixed `= ρσv·∂x∂v`
#[derive(Debug, Clone)]
pub struct FdmHestonOp {
    process: Arc<HestonProcess>,
    dx: TripleBandLinearOp,
    x_diffusion: TripleBandLinearOp,
    v_map_base: TripleBandLinearOp,
    mixed: NinePointLinearOp,
    half_variance: Array,
    map_x: TripleBandLinearOp,
    map_v: TripleBandLinearOp,
}

impl FdmHestonOp {
    /// Operator on `mesh`.
    pub fn new(mesh: &FdmMesherComposite, process: Arc<HestonProcess>) -> Result<Self> {
        ensure!(mesh.dimensions() == 2, "Heston operator needs a two-dimensional mesh");
        let v = mesh.locations(1);
        let half_variance = &v * 0.5;
        let (kappa, theta, sigma, rho) = (process.kappa(), process.theta(), process.sigma(), process.rho());

        let dx = FirstDerivativeOp::new(0, mesh);
        let x_diffusion = SecondDerivativeOp::new(0, mesh).mult(&half_variance);
        let v_drift = v.map(|v| kappa * (theta - v));
        let v_map_base = TripleBandLinearOp::axpyb(
            Some(&v_drift),
            &FirstDerivativeOp::new(1, mesh),
            &SecondDerivativeOp::new(1, mesh).mult(&(&v * (0.5 * sigma * sigma))),
            None,
        )?;
        let mixed = NinePointLinearOp::mixed_derivative(0, 1, mesh)?.mult(&(&v * (rho * sigma)));
        let layout = Arc::clone(mesh.layout());
        Ok(Self {
            process,
            dx,
            x_diffusion,
            v_map_base,
            mixed,
            half_variance,
            map_x: TripleBandLinearOp::zero(0, Arc::clone(&layout)),
            map_v: TripleBandLinearOp::zero(1, layout),
        })
    }
}

impl FdmLinearOpComposite for FdmHestonOp {
    fn size(&self) -> usize {
        2
    }

    fn set_time(&mut self, t1: Time, t2: Time) -> Result<()> {
        ensure!(t2 > t1, "empty time step [{t1}, {t2}]");
        let r = self.process.risk_free_rate()?.forward_rate(t1, t2)?;
        let q = self.process.dividend_yield()?.forward_rate(t1, t2)?;
        let n = self.half_variance.len();
        let half_rate = Array::from_element(n, -0.5 * r);
        let x_drift = self.half_variance.map(|hv| r - q - hv);
        self.map_x = TripleBandLinearOp::axpyb(Some(&x_drift), &self.dx, &self.x_diffusion, Some(&half_rate))?;
        self.map_v = self.v_map_base.add_diagonal(&half_rate);
        Ok(())
    }

    fn apply(&self, r: &Array) -> Array {
        let mut y = self.map_x.apply(r);
        y += &self.map_v.apply(r);
        y += &self.mixed.apply(r);
        y
    }

    fn apply_mixed(&self, r: &Array) -> Array {
        self.mixed.apply(r)
    }

    fn apply_direction(&self, direction: usize, r: &Array) -> Array {
        match direction {
            0 => self.map_x.apply(r),
            1 => self.map_v.apply(r),
            _ => Array::zeros(r.len()),
        }
    }

    fn solve_splitting(&self, direction: usize, r: &Array, a: Real) -> Array {
        match direction {
            0 => self.map_x.solve_splitting(r, a, 1.0),
            1 => self.map_v.solve_splitting(r, a, 1.0),
            _ => r.clone(),
        }
    }
}
