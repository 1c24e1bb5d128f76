//! One-dimensional meshers and their tensor product.

use std::fmt::Debug;
use std::sync::Arc;

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_math::{normal_cdf_inverse, Array};
use ql_processes::{GeneralizedBlackScholesProcess, HestonProcess};
use ql_termstructures::YieldTermStructure;

use super::layout::FdmLinearOpLayout;

/// Increasing grid locations along one direction.
pub trait Fdm1dMesher: Debug + Send + Sync {
    /// All locations.
    fn locations(&self) -> &[Real];

    /// Number of locations.
    fn size(&self) -> usize {
        self.locations().len()
    }

    /// Location `i`.
    fn location(&self, i: usize) -> Real {
        self.locations()[i]
    }

    /// Distance to the next location; `None` at the last one.
    fn dplus(&self, i: usize) -> Option<Real> {
        let x = self.locations();
        (i + 1 < x.len()).then(|| x[i + 1] - x[i])
    }

    /// Distance to the previous location; `None` at the first one.
    fn dminus(&self, i: usize) -> Option<Real> {
        let x = self.locations();
        (i > 0).then(|| x[i] - x[i - 1])
    }
}

// ─── Uniform ──────────────────────────────────────────────────────────────────

/// Equally spaced locations on `[start, end]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform1dMesher {
    locations: Vec<Real>,
}

impl Uniform1dMesher {
    /// `size` points from `start` to `end`.
    pub fn new(start: Real, end: Real, size: usize) -> Result<Self> {
        ensure!(end > start, "mesher end {end} not after start {start}");
        ensure!(size >= 2, "mesher needs at least two points, got {size}");
        let dx = (end - start) / (size - 1) as Real;
        let mut locations: Vec<Real> = (0..size).map(|i| start + i as Real * dx).collect();
        locations[size - 1] = end;
        Ok(Self { locations })
    }
}

impl Fdm1dMesher for Uniform1dMesher {
    fn locations(&self) -> &[Real] {
        &self.locations
    }
}

// ─── Concentrating ────────────────────────────────────────────────────────────

/// Concentration of grid points around a location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Concentration {
    /// Where points cluster.
    pub point: Real,
    /// Width of the cluster relative to the mesh length; smaller is denser.
    pub density: Real,
    /// Place `point` exactly on the grid.
    pub require_point: bool,
}

/// Points on `[start, end]` clustered by a `sinh` transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Concentrating1dMesher {
    locations: Vec<Real>,
}

impl Concentrating1dMesher {
    /// `size` points from `start` to `end`, uniform without a concentration.
    pub fn new(start: Real, end: Real, size: usize, concentration: Option<Concentration>) -> Result<Self> {
        ensure!(end > start, "mesher end {end} not after start {start}");
        ensure!(size >= 2, "mesher needs at least two points, got {size}");
        let Some(c) = concentration.filter(|c| c.point > start && c.point < end) else {
            return Ok(Self {
                locations: Uniform1dMesher::new(start, end, size)?.locations,
            });
        };
        ensure!(c.density > 0.0, "concentration density must be positive, got {}", c.density);
        let width = c.density * (end - start);
        let c1 = ((start - c.point) / width).asinh();
        let c2 = ((end - c.point) / width).asinh();
        let last = (size - 1) as Real;

        let mut locations: Vec<Real> = if c.require_point && size >= 3 {
            // split at the node nearest to the point so both halves end on it
            let z0 = -c1 / (c2 - c1);
            let k = (z0 * last).round().clamp(1.0, last - 1.0) as usize;
            (0..size)
                .map(|i| {
                    if i <= k {
                        c.point + width * (c1 * (k - i) as Real / k as Real).sinh()
                    } else {
                        c.point + width * (c2 * (i - k) as Real / (size - 1 - k) as Real).sinh()
                    }
                })
                .collect()
        } else {
            (0..size)
                .map(|i| c.point + width * (c1 + (c2 - c1) * i as Real / last).sinh())
                .collect()
        };
        locations[0] = start;
        locations[size - 1] = end;
        Ok(Self { locations })
    }
}

impl Fdm1dMesher for Concentrating1dMesher {
    fn locations(&self) -> &[Real] {
        &self.locations
    }
}

// ─── Black-Scholes log-spot ───────────────────────────────────────────────────

/// Settings of [`FdmBlackScholesMesher`].
#[derive(Debug, Clone, PartialEq)]
pub struct FdmBlackScholesMesherParams {
    /// Tail probability left outside the mesh on each side.
    pub eps: Real,
    /// Widening applied to the quantile range.
    pub scale_factor: Real,
    /// Spot level and relative density to concentrate on.
    pub concentration: Option<(Real, Real)>,
    /// Lower bound in log-spot, overriding the computed one.
    pub x_min: Option<Real>,
    /// Upper bound in log-spot, overriding the computed one.
    pub x_max: Option<Real>,
    /// Cash dividends `(time, amount)` lowering the forward.
    pub dividends: Vec<(Time, Real)>,
}

impl Default for FdmBlackScholesMesherParams {
    fn default() -> Self {
        Self {
            eps: 1e-4,
            scale_factor: 1.5,
            concentration: None,
            x_min: None,
            x_max: None,
            dividends: Vec::new(),
        }
    }
}

/// Log-spot mesh covering the bulk of the terminal distribution.
///
/// Spans `ln F ∓ σ√T·Φ⁻¹(1 − eps)·scale` around the smallest and largest
/// forward seen before maturity.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmBlackScholesMesher {
    locations: Vec<Real>,
}

impl FdmBlackScholesMesher {
    /// Mesh for `process` up to `maturity`, using its volatility at `strike`.
    pub fn new(
        size: usize,
        process: &GeneralizedBlackScholesProcess,
        maturity: Time,
        strike: Real,
        params: &FdmBlackScholesMesherParams,
    ) -> Result<Self> {
        let volatility = process.black_volatility(maturity, strike)?;
        Self::with_volatility(
            size,
            process.x0_value()?,
            process.risk_free_rate()?.as_ref(),
            process.dividend_yield()?.as_ref(),
            maturity,
            volatility,
            params,
        )
    }

    /// Mesh for a constant `volatility` estimate.
    pub fn with_volatility(
        size: usize,
        spot: Real,
        risk_free: &dyn YieldTermStructure,
        dividend_yield: &dyn YieldTermStructure,
        maturity: Time,
        volatility: Real,
        params: &FdmBlackScholesMesherParams,
    ) -> Result<Self> {
        ensure!(spot > 0.0, "spot must be positive, got {spot}");
        ensure!(maturity > 0.0, "maturity must be positive, got {maturity}");
        ensure!(params.eps > 0.0 && params.eps < 0.5, "eps must lie in (0, 0.5)");

        let mut steps: Vec<(Time, Real)> = params
            .dividends
            .iter()
            .filter(|(t, _)| *t > 0.0 && *t <= maturity)
            .map(|&(t, d)| (t, -d))
            .collect();
        let intermediate = ((24.0 * maturity) as usize).max(2);
        steps.extend((1..=intermediate).map(|i| (i as Real * maturity / intermediate as Real, 0.0)));
        steps.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mut lowest, mut highest, mut forward, mut last) = (spot, spot, spot, 0.0);
        for (t, jump) in steps {
            let growth = dividend_yield.discount(t)? * risk_free.discount(last)?
                / (risk_free.discount(t)? * dividend_yield.discount(last)?);
            forward = forward * growth + jump;
            lowest = lowest.min(forward);
            highest = highest.max(forward);
            last = t;
        }
        let lowest = lowest.max(1e-4 * spot);

        let spread = volatility * maturity.sqrt() * normal_cdf_inverse(1.0 - params.eps) * params.scale_factor;
        let x_min = params.x_min.unwrap_or(lowest.ln() - spread);
        let x_max = params.x_max.unwrap_or(highest.ln() + spread);
        ensure!(x_max > x_min, "empty log-spot range [{x_min}, {x_max}]");

        let concentration = params.concentration.map(|(point, density)| Concentration {
            point: point.ln(),
            density,
            require_point: true,
        });
        Ok(Self {
            locations: Concentrating1dMesher::new(x_min, x_max, size, concentration)?.locations,
        })
    }
}

impl Fdm1dMesher for FdmBlackScholesMesher {
    fn locations(&self) -> &[Real] {
        &self.locations
    }
}

// ─── Heston variance ──────────────────────────────────────────────────────────

/// Variance mesh from zero to several standard deviations of the CIR
/// transition, concentrated at `v0`.
#[derive(Debug, Clone, PartialEq)]
pub struct FdmHestonVarianceMesher {
    locations: Vec<Real>,
    vol_estimate: Real,
}

impl FdmHestonVarianceMesher {
    /// Number of standard deviations above the mean covered by the mesh.
    pub const STD_DEVS: Real = 5.0;

    /// Mesh of `size` points for `process` up to `maturity`.
    pub fn new(size: usize, process: &HestonProcess, maturity: Time) -> Result<Self> {
        ensure!(size >= 3, "variance mesher needs at least three points, got {size}");
        ensure!(maturity > 0.0, "maturity must be positive, got {maturity}");
        let (v0, kappa, theta, sigma) = (process.v0(), process.kappa(), process.theta(), process.sigma());
        let decay = (-kappa * maturity).exp();
        let mean = theta + (v0 - theta) * decay;
        let variance = v0 * sigma * sigma * decay * (1.0 - decay) / kappa
            + theta * sigma * sigma * (1.0 - decay).powi(2) / (2.0 * kappa);
        let v_max = v0.max(mean) + Self::STD_DEVS * variance.sqrt();
        let v_max = v_max.max(2.0 * v0.max(theta));

        let mesher = Concentrating1dMesher::new(
            0.0,
            v_max,
            size,
            Some(Concentration {
                point: v0,
                density: 0.1,
                require_point: true,
            }),
        )?;
        let average_variance = theta + (v0 - theta) * (1.0 - decay) / (kappa * maturity);
        Ok(Self {
            locations: mesher.locations,
            vol_estimate: average_variance.max(0.0).sqrt(),
        })
    }

    /// Volatility of the time-averaged expected variance, used to size the
    /// spot mesh.
    pub fn vol_estimate(&self) -> Real {
        self.vol_estimate
    }
}

impl Fdm1dMesher for FdmHestonVarianceMesher {
    fn locations(&self) -> &[Real] {
        &self.locations
    }
}

// ─── Composite ────────────────────────────────────────────────────────────────

/// Tensor product of one-dimensional meshers.
#[derive(Debug, Clone)]
pub struct FdmMesherComposite {
    meshers: Vec<Arc<dyn Fdm1dMesher>>,
    layout: Arc<FdmLinearOpLayout>,
}

impl FdmMesherComposite {
    /// Mesh whose direction `d` follows `meshers[d]`.
    pub fn new(meshers: Vec<Arc<dyn Fdm1dMesher>>) -> Result<Self> {
        let layout = FdmLinearOpLayout::new(meshers.iter().map(|m| m.size()).collect())?;
        Ok(Self {
            meshers,
            layout: Arc::new(layout),
        })
    }

    /// Index layout.
    pub fn layout(&self) -> &Arc<FdmLinearOpLayout> {
        &self.layout
    }

    /// Number of directions.
    pub fn dimensions(&self) -> usize {
        self.meshers.len()
    }

    /// Mesher along `direction`.
    pub fn mesher(&self, direction: usize) -> &Arc<dyn Fdm1dMesher> {
        &self.meshers[direction]
    }

    /// Location along `direction` of the point at flat `index`.
    pub fn location(&self, index: usize, direction: usize) -> Real {
        self.meshers[direction].location(self.layout.coordinate(index, direction))
    }

    /// Location along `direction` of every grid point.
    pub fn locations(&self, direction: usize) -> Array {
        Array::from_fn(self.layout.size(), |i| self.location(i, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn uniform_spacing() {
        let m = Uniform1dMesher::new(-1.0, 1.0, 5).unwrap();
        assert_eq!(m.locations(), &[-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(m.dplus(4), None);
        assert_eq!(m.dminus(0), None);
        assert_abs_diff_eq!(m.dplus(1).unwrap(), 0.5);
    }

    #[test]
    fn concentrating_mesher_hits_the_point() {
        let c = Concentration {
            point: 0.3,
            density: 0.05,
            require_point: true,
        };
        let m = Concentrating1dMesher::new(0.0, 1.0, 51, Some(c)).unwrap();
        let x = m.locations();
        assert_eq!(x[0], 0.0);
        assert_eq!(x[50], 1.0);
        assert!(x.windows(2).all(|w| w[1] > w[0]));
        let k = x.iter().position(|&v| (v - 0.3).abs() < 1e-12);
        let k = k.expect("point on grid");
        // denser near the point than at the edges
        assert!(x[k + 1] - x[k] < x[50] - x[49]);
        assert!(x[k] - x[k - 1] < x[1] - x[0]);
    }

    #[test]
    fn concentration_outside_range_is_uniform() {
        let c = Concentration {
            point: 5.0,
            density: 0.1,
            require_point: true,
        };
        let m = Concentrating1dMesher::new(0.0, 1.0, 3, Some(c)).unwrap();
        assert_eq!(m.locations(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn composite_locations_follow_layout() {
        let x: Arc<dyn Fdm1dMesher> = Arc::new(Uniform1dMesher::new(0.0, 2.0, 3).unwrap());
        let v: Arc<dyn Fdm1dMesher> = Arc::new(Uniform1dMesher::new(0.0, 1.0, 2).unwrap());
        let mesh = FdmMesherComposite::new(vec![x, v]).unwrap();
        assert_eq!(mesh.locations(0).as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(mesh.locations(1).as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
