//! Time-stepping schemes.
//!
//! Every scheme advances the solution backwards by one step `dt` from time
//! `t`, with the operator frozen on `[t − dt, t]`.  The ADI schemes split
//! the operator by direction and treat the mixed part explicitly.

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{Real, Time};
use ql_math::matrix_utilities::BiCGStab;
use ql_math::Array;

use super::boundary::FdmBoundaryConditionSet;
use super::operators::FdmLinearOpComposite;

const IMPLICIT_TOLERANCE: Real = 1e-8;
const IMPLICIT_MAX_ITERATIONS: usize = 200;

/// Scheme selection with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FdmSchemeDesc {
    /// Douglas ADI.
    Douglas {
        /// Implicitness.
        theta: Real,
    },
    /// Craig-Sneyd ADI.
    CraigSneyd {
        /// Implicitness.
        theta: Real,
        /// Weight of the mixed-derivative correction.
        mu: Real,
    },
    /// Modified Craig-Sneyd ADI.
    ModifiedCraigSneyd {
        /// Implicitness.
        theta: Real,
        /// Weight of the mixed-derivative correction.
        mu: Real,
    },
    /// Hundsdorfer-Verwer ADI.
    Hundsdorfer {
        /// Implicitness.
        theta: Real,
        /// Weight of the corrector.
        mu: Real,
    },
    /// Fully implicit Euler.
    ImplicitEuler,
    /// Explicit Euler.
    ExplicitEuler,
    /// θ-scheme: explicit `(1 − θ)` then implicit `θ`.
    CrankNicolson {
        /// Implicitness.
        theta: Real,
    },
}

impl Default for FdmSchemeDesc {
    fn default() -> Self {
        Self::douglas()
    }
}

impl FdmSchemeDesc {
    /// Douglas with `θ = ½`.
    pub fn douglas() -> Self {
        Self::Douglas { theta: 0.5 }
    }

    /// Craig-Sneyd with `θ = μ = ½`.
    pub fn craig_sneyd() -> Self {
        Self::CraigSneyd { theta: 0.5, mu: 0.5 }
    }

    /// Modified Craig-Sneyd with `θ = μ = ⅓`.
    pub fn modified_craig_sneyd() -> Self {
        Self::ModifiedCraigSneyd {
            theta: 1.0 / 3.0,
            mu: 1.0 / 3.0,
        }
    }

    /// Hundsdorfer with `θ = ½ + √3/6`, `μ = ½`.
    pub fn hundsdorfer() -> Self {
        Self::Hundsdorfer {
            theta: 0.5 + 3.0_f64.sqrt() / 6.0,
            mu: 0.5,
        }
    }

    /// Crank-Nicolson with `θ = ½`.
    pub fn crank_nicolson() -> Self {
        Self::CrankNicolson { theta: 0.5 }
    }

    /// Step `a` back from `t` to `t − dt`.
    pub fn step(
        &self,
        op: &mut dyn FdmLinearOpComposite,
        bc: &FdmBoundaryConditionSet,
        a: &mut Array,
        t: Time,
        dt: Time,
    ) -> Result<()> {
        op.set_time((t - dt).max(0.0), t)?;
        match *self {
            Self::ExplicitEuler => {
                explicit_step(op, bc, a, dt);
                Ok(())
            }
            Self::ImplicitEuler => implicit_step(op, bc, a, dt),
            Self::CrankNicolson { theta } => {
                if theta < 1.0 {
                    explicit_step(op, bc, a, (1.0 - theta) * dt);
                }
                if theta > 0.0 {
                    implicit_step(op, bc, a, theta * dt)?;
                }
                Ok(())
            }
            Self::Douglas { theta } => {
                let mut y = predictor(op, bc, a, dt);
                y = directional_sweep(op, &y, a, theta * dt);
                bc.apply_after_solving(&mut y);
                *a = y;
                Ok(())
            }
            Self::CraigSneyd { theta, mu } => {
                let y0 = predictor(op, bc, a, dt);
                let y = directional_sweep(op, &y0, a, theta * dt);
                let mut yt = &y0 + &(op.apply_mixed(&(&y - &*a)) * (mu * dt));
                bc.apply_after_applying(&mut yt);
                yt = directional_sweep(op, &yt, a, theta * dt);
                bc.apply_after_solving(&mut yt);
                *a = yt;
                Ok(())
            }
            Self::ModifiedCraigSneyd { theta, mu } => {
                let y0 = predictor(op, bc, a, dt);
                let y = directional_sweep(op, &y0, a, theta * dt);
                let diff = &y - &*a;
                let mut yt = &y0 + &(op.apply_mixed(&diff) * (mu * dt));
                yt += &(op.apply(&diff) * ((0.5 - theta) * dt));
                bc.apply_after_applying(&mut yt);
                yt = directional_sweep(op, &yt, a, theta * dt);
                bc.apply_after_solving(&mut yt);
                *a = yt;
                Ok(())
            }
            Self::Hundsdorfer { theta, mu } => {
                let y0 = predictor(op, bc, a, dt);
                let mut y = directional_sweep(op, &y0, a, theta * dt);
                bc.apply_after_solving(&mut y);
                let mut yt = &y0 + &(op.apply(&(&y - &*a)) * (mu * dt));
                bc.apply_after_applying(&mut yt);
                yt = directional_sweep(op, &yt, &y, theta * dt);
                bc.apply_after_solving(&mut yt);
                *a = yt;
                Ok(())
            }
        }
    }
}

/// `y = a + dt·L·a`.
fn predictor(op: &dyn FdmLinearOpComposite, bc: &FdmBoundaryConditionSet, a: &Array, dt: Time) -> Array {
    let mut y = a + &(op.apply(a) * dt);
    bc.apply_after_applying(&mut y);
    y
}

/// For each direction `i`: `y ← (I − θdt·L_i)⁻¹·(y − θdt·L_i·base)`.
fn directional_sweep(op: &dyn FdmLinearOpComposite, y: &Array, base: &Array, theta_dt: Time) -> Array {
    let mut y = y.clone();
    for i in 0..op.size() {
        let rhs = &y - &(op.apply_direction(i, base) * theta_dt);
        y = op.solve_splitting(i, &rhs, -theta_dt);
    }
    y
}

fn explicit_step(op: &dyn FdmLinearOpComposite, bc: &FdmBoundaryConditionSet, a: &mut Array, dt: Time) {
    *a = predictor(op, bc, a, dt);
}

fn implicit_step(op: &dyn FdmLinearOpComposite, bc: &FdmBoundaryConditionSet, a: &mut Array, dt: Time) -> Result<()> {
    let mut x = if op.size() == 1 {
        op.solve_splitting(0, a, -dt)
    } else {
        let rhs = a.clone();
        let system = |v: &Array| v - &(op.apply(v) * dt);
        let preconditioner = |v: &Array| op.preconditioner(v, dt);
        BiCGStab::new(IMPLICIT_MAX_ITERATIONS, IMPLICIT_TOLERANCE)
            .solve(system, &rhs, Some(&rhs), Some(preconditioner))?
            .x
    };
    bc.apply_after_solving(&mut x);
    *a = x;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finite_differences::meshers::{Fdm1dMesher, FdmMesherComposite, Uniform1dMesher};
    use crate::finite_differences::operators::{SecondDerivativeOp, TripleBandLinearOp};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    /// Heat equation `∂u/∂τ = ∂xx u` on `[0, π]` with zero boundaries.
    #[derive(Debug)]
    struct Heat(TripleBandLinearOp);

    impl FdmLinearOpComposite for Heat {
        fn size(&self) -> usize {
            1
        }
        fn set_time(&mut self, _t1: Time, _t2: Time) -> Result<()> {
            Ok(())
        }
        fn apply(&self, r: &Array) -> Array {
            self.0.apply(r)
        }
        fn apply_mixed(&self, r: &Array) -> Array {
            Array::zeros(r.len())
        }
        fn apply_direction(&self, _direction: usize, r: &Array) -> Array {
            self.0.apply(r)
        }
        fn solve_splitting(&self, _direction: usize, r: &Array, a: Real) -> Array {
            self.0.solve_splitting(r, a, 1.0)
        }
    }

    fn evolve(scheme: FdmSchemeDesc, steps: usize) -> (Array, Array) {
        let m: Arc<dyn Fdm1dMesher> = Arc::new(Uniform1dMesher::new(0.0, std::f64::consts::PI, 51).unwrap());
        let mesh = FdmMesherComposite::new(vec![m]).unwrap();
        let mut op = Heat(SecondDerivativeOp::new(0, &mesh));
        let x = mesh.locations(0);
        let mut a = x.map(Real::sin);
        let bc = FdmBoundaryConditionSet::new();
        let dt = 0.5 / steps as Real;
        for i in 0..steps {
            let t = 0.5 - i as Real * dt;
            scheme.step(&mut op, &bc, &mut a, t, dt).unwrap();
        }
        (x, a)
    }

    #[test]
    fn schemes_decay_the_heat_mode() {
        // sin(x) decays as exp(−τ)
        let expected = (-0.5_f64).exp();
        for scheme in [
            FdmSchemeDesc::douglas(),
            FdmSchemeDesc::craig_sneyd(),
            FdmSchemeDesc::modified_craig_sneyd(),
            FdmSchemeDesc::hundsdorfer(),
            FdmSchemeDesc::crank_nicolson(),
            FdmSchemeDesc::ImplicitEuler,
        ] {
            let (x, a) = evolve(scheme, 100);
            let mid = 25;
            assert_abs_diff_eq!(a[mid] / x[mid].sin(), expected, epsilon = 5e-3);
        }
    }

    #[test]
    fn explicit_euler_with_small_steps() {
        let (x, a) = evolve(FdmSchemeDesc::ExplicitEuler, 2000);
        assert_abs_diff_eq!(a[25] / x[25].sin(), (-0.5_f64).exp(), epsilon = 5e-3);
    }

    #[test]
    fn scheme_descriptors_round_trip_through_serde() {
        let json = serde_json::to_string(&FdmSchemeDesc::hundsdorfer()).unwrap();
        let back: FdmSchemeDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FdmSchemeDesc::hundsdorfer());
    }
}
