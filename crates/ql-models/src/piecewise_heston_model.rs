//! Heston model with piecewise-constant parameters.
//!
//! `κ`, `θ`, `σ` and `ρ` are constant on each interval of a time grid and
//! `v₀` is a single value.  The characteristic function is obtained by
//! propagating the Riccati coefficients backwards interval by interval.

use std::sync::Arc;

use num_complex::Complex64;

use ql_core::errors::Result;
use ql_core::versioning::{latest_version, Version, VersionStamp, Versioned};
use ql_core::{ensure, Handle, Real, Time};
use ql_math::optimization::Constraint;
use ql_quotes::Quote;
use ql_termstructures::YieldTermStructure;

use crate::calibrated_model::{distribute, CalibratedModel, Parameter};
use crate::heston_model::{heston_decay_rate, riccati_step, HestonCharacteristic};

const KAPPA: usize = 0;
const THETA: usize = 1;
const SIGMA: usize = 2;
const RHO: usize = 3;
const V0: usize = 4;

/// Heston model whose `κ`, `θ`, `σ` and `ρ` are piecewise constant on a
/// common time grid.
///
/// The parameter vector is the `κ` values, then `θ`, `σ` and `ρ`, each
/// with one entry per interval, then `v₀`.
#[derive(Debug, Clone)]
pub struct PiecewiseTimeDependentHestonModel {
    risk_free_rate: Handle<dyn YieldTermStructure>,
    dividend_yield: Handle<dyn YieldTermStructure>,
    s0: Handle<dyn Quote>,
    times: Vec<Time>,
    params: Vec<Parameter>,
    stamp: VersionStamp,
}

/// Initial values of a [`PiecewiseTimeDependentHestonModel`], one entry
/// per interval of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseHestonParameters {
    /// Mean-reversion speeds.
    pub kappa: Vec<Real>,
    /// Long-run variances.
    pub theta: Vec<Real>,
    /// Volatilities of variance.
    pub sigma: Vec<Real>,
    /// Correlations.
    pub rho: Vec<Real>,
    /// Initial variance.
    pub v0: Real,
}

impl PiecewiseHestonParameters {
    /// The same values on every one of `intervals` intervals.
    pub fn flat(intervals: usize, v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real) -> Self {
        Self {
            kappa: vec![kappa; intervals],
            theta: vec![theta; intervals],
            sigma: vec![sigma; intervals],
            rho: vec![rho; intervals],
            v0,
        }
    }
}

impl PiecewiseTimeDependentHestonModel {
    /// Model on the breakpoints `times` (positive, increasing).
    pub fn new(
        risk_free_rate: Handle<dyn YieldTermStructure>,
        dividend_yield: Handle<dyn YieldTermStructure>,
        s0: Handle<dyn Quote>,
        times: Vec<Time>,
        initial: PiecewiseHestonParameters,
    ) -> Result<Self> {
        let piecewise = |values: Vec<Real>, constraint| Parameter::piecewise(times.clone(), values, constraint);
        let params = vec![
            piecewise(initial.kappa, Constraint::Positive)?,
            piecewise(initial.theta, Constraint::Positive)?,
            piecewise(initial.sigma, Constraint::Positive)?,
            piecewise(initial.rho, Constraint::Boundary { low: -1.0, high: 1.0 })?,
            Parameter::constant(initial.v0, Constraint::Positive),
        ];
        validate(&params)?;
        Ok(Self {
            risk_free_rate,
            dividend_yield,
            s0,
            times,
            params,
            stamp: VersionStamp::new(),
        })
    }

    /// Interval breakpoints.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Mean-reversion speed at `t`.
    pub fn kappa(&self, t: Time) -> Real {
        self.params[KAPPA].value(t)
    }

    /// Long-run variance at `t`.
    pub fn theta(&self, t: Time) -> Real {
        self.params[THETA].value(t)
    }

    /// Volatility of variance at `t`.
    pub fn sigma(&self, t: Time) -> Real {
        self.params[SIGMA].value(t)
    }

    /// Correlation at `t`.
    pub fn rho(&self, t: Time) -> Real {
        self.params[RHO].value(t)
    }

    /// Interval boundaries of `[0, t]`.
    fn boundaries(&self, t: Time) -> Vec<Time> {
        let mut points = vec![0.0];
        points.extend(self.times.iter().copied().filter(|&x| x < t));
        points.push(t);
        points
    }
}

fn validate(params: &[Parameter]) -> Result<()> {
    for (name, index) in [("mean reversion", KAPPA), ("long-run variance", THETA), ("vol of variance", SIGMA)] {
        ensure!(
            params[index].values().iter().all(|&v| v > 0.0),
            "{name} values must be positive"
        );
    }
    ensure!(
        params[RHO].values().iter().all(|v| (-1.0..=1.0).contains(v)),
        "correlation values must be in [-1, 1]"
    );
    ensure!(params[V0].value(0.0) >= 0.0, "initial variance must be non-negative");
    Ok(())
}

impl CalibratedModel for PiecewiseTimeDependentHestonModel {
    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn set_params(&mut self, values: &[Real]) -> Result<()> {
        let mut params = self.params.clone();
        distribute(&mut params, values)?;
        validate(&params)?;
        self.params = params;
        self.stamp.touch();
        Ok(())
    }
}

impl HestonCharacteristic for PiecewiseTimeDependentHestonModel {
    fn spot(&self) -> Result<Real> {
        self.s0.current()?.value()
    }

    fn risk_free_rate(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.risk_free_rate.current()
    }

    fn dividend_yield(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.dividend_yield.current()
    }

    fn characteristic_function(&self, u: Complex64, t: Time) -> Complex64 {
        let zero = Complex64::new(0.0, 0.0);
        let points = self.boundaries(t);
        let (c, d) = points.windows(2).rev().fold((zero, zero), |(c, d), w| {
            let mid = 0.5 * (w[0] + w[1]);
            riccati_step(
                u,
                w[1] - w[0],
                self.kappa(mid),
                self.theta(mid),
                self.sigma(mid),
                self.rho(mid),
                c,
                d,
            )
        });
        (c + d * self.v0()).exp()
    }

    fn v0(&self) -> Real {
        self.params[V0].value(0.0)
    }

    fn decay_rate(&self, t: Time) -> Real {
        // use the slowest-decaying interval
        self.boundaries(t)
            .windows(2)
            .map(|w| {
                let mid = 0.5 * (w[0] + w[1]);
                heston_decay_rate(self.v0(), self.kappa(mid), self.theta(mid), self.sigma(mid), self.rho(mid), t)
            })
            .fold(Real::INFINITY, Real::min)
    }
}

impl Versioned for PiecewiseTimeDependentHestonModel {
    fn version(&self) -> Version {
        latest_version([
            self.stamp.get(),
            self.s0.version(),
            self.risk_free_rate.version(),
            self.dividend_yield.version(),
        ])
    }
}
